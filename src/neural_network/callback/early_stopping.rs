use super::{Callback, CallbackAction};
use crate::error::TrainingError;
use crate::neural_network::{EpochLogs, Monitor, SerializableLayerWeight, Sequential};
use log::info;

/// Stops training once the monitored quantity has stopped improving.
///
/// After every epoch without an improvement larger than `min_delta` a wait
/// counter grows; an improvement resets it. When it reaches `patience` the
/// callback requests a stop. With `restore_best_weights` the weights of the
/// best epoch are put back when training ends, whether or not the stop fired.
///
/// # Example
/// ```rust
/// use modelsmith::neural_network::{EarlyStopping, Monitor};
///
/// let es = EarlyStopping::new(Monitor::ValLoss, 20).restore_best_weights(true);
/// assert_eq!(es.patience(), 20);
/// ```
pub struct EarlyStopping {
    monitor: Monitor,
    patience: usize,
    min_delta: f32,
    restore_best_weights: bool,
    wait: usize,
    best: f32,
    best_epoch: Option<usize>,
    best_weights: Option<Vec<SerializableLayerWeight>>,
    stopped_epoch: Option<usize>,
}

impl EarlyStopping {
    pub fn new(monitor: Monitor, patience: usize) -> Self {
        Self {
            monitor,
            patience,
            min_delta: 0.0,
            restore_best_weights: false,
            wait: 0,
            best: monitor.initial_best(),
            best_epoch: None,
            best_weights: None,
            stopped_epoch: None,
        }
    }

    /// Minimum change that counts as an improvement; the sign is ignored.
    pub fn with_min_delta(mut self, min_delta: f32) -> Self {
        self.min_delta = min_delta.abs();
        self
    }

    pub fn restore_best_weights(mut self, restore: bool) -> Self {
        self.restore_best_weights = restore;
        self
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn best(&self) -> f32 {
        self.best
    }

    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }
}

impl Callback for EarlyStopping {
    fn on_train_begin(&mut self, _model: &Sequential) -> Result<(), TrainingError> {
        self.wait = 0;
        self.best = self.monitor.initial_best();
        self.best_epoch = None;
        self.best_weights = None;
        self.stopped_epoch = None;
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        logs: &EpochLogs,
        model: &mut Sequential,
    ) -> Result<CallbackAction, TrainingError> {
        let Some(current) = logs.get(&self.monitor) else {
            return Ok(CallbackAction::Continue);
        };

        self.wait += 1;
        if self.monitor.is_improvement(current, self.best, self.min_delta) {
            self.best = current;
            self.best_epoch = Some(logs.epoch);
            if self.restore_best_weights {
                self.best_weights = Some(model.snapshot_weights());
            }
            self.wait = 0;
            return Ok(CallbackAction::Continue);
        }

        if self.wait >= self.patience && logs.epoch > 0 {
            self.stopped_epoch = Some(logs.epoch);
            return Ok(CallbackAction::StopTraining);
        }

        Ok(CallbackAction::Continue)
    }

    fn on_train_end(&mut self, model: &mut Sequential) -> Result<(), TrainingError> {
        if let Some(epoch) = self.stopped_epoch {
            info!("Epoch {}: early stopping", epoch + 1);
        }

        if self.restore_best_weights {
            if let (Some(weights), Some(best_epoch)) = (&self.best_weights, self.best_epoch) {
                info!(
                    "Restoring model weights from the end of the best epoch: {}",
                    best_epoch + 1
                );
                model.restore_weights(weights)?;
            }
        }
        Ok(())
    }

    fn monitor(&self) -> Option<Monitor> {
        Some(self.monitor)
    }
}
