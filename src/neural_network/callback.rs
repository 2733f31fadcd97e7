/// Early termination on a stalled monitored quantity
pub mod early_stopping;
/// Saving the model whenever the monitored quantity improves
pub mod model_checkpoint;

pub use early_stopping::*;
pub use model_checkpoint::*;

use crate::error::TrainingError;
use crate::neural_network::{EpochLogs, Monitor, Sequential};

/// Decision a callback returns at the end of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    StopTraining,
}

/// Hooks invoked by [`Sequential::fit_dataset`] around the training loop.
///
/// Callbacks run in the order they were registered. Training stops after the
/// current epoch when any callback returns [`CallbackAction::StopTraining`];
/// every callback still sees that epoch.
pub trait Callback {
    /// Called once before the first epoch.
    fn on_train_begin(&mut self, _model: &Sequential) -> Result<(), TrainingError> {
        Ok(())
    }

    /// Called after every epoch with the epoch's logs.
    fn on_epoch_end(
        &mut self,
        logs: &EpochLogs,
        model: &mut Sequential,
    ) -> Result<CallbackAction, TrainingError>;

    /// Called once after the last epoch, including after an early stop.
    fn on_train_end(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        Ok(())
    }

    /// Quantity the callback watches, if any.
    fn monitor(&self) -> Option<Monitor> {
        None
    }
}
