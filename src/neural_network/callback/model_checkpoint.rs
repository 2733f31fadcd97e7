use super::{Callback, CallbackAction};
use crate::error::{IoError, TrainingError};
use crate::neural_network::{EpochLogs, Monitor, Sequential};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Writes the model to disk during training.
///
/// With `save_best_only` the file is written only when the monitored quantity
/// improves on the best value seen so far, so the file always holds the best
/// model. Otherwise it is rewritten after every epoch.
///
/// With `save_weights_only = false` the file holds architecture plus weights
/// ([`Sequential::load_model`] restores it); with `true` only the weights
/// ([`Sequential::load_from_path`] applies them to an already-built model).
///
/// Missing parent directories are created on the first write.
pub struct ModelCheckpoint {
    filepath: PathBuf,
    monitor: Monitor,
    save_best_only: bool,
    save_weights_only: bool,
    best: f32,
    saves: usize,
}

impl ModelCheckpoint {
    /// Checkpoint monitoring `val_loss` that keeps only the best full model.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            monitor: Monitor::ValLoss,
            save_best_only: true,
            save_weights_only: false,
            best: Monitor::ValLoss.initial_best(),
            saves: 0,
        }
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = monitor;
        self.best = monitor.initial_best();
        self
    }

    pub fn save_best_only(mut self, save_best_only: bool) -> Self {
        self.save_best_only = save_best_only;
        self
    }

    pub fn save_weights_only(mut self, save_weights_only: bool) -> Self {
        self.save_weights_only = save_weights_only;
        self
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Number of times the file has been written.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Best monitored value seen so far.
    pub fn best(&self) -> f32 {
        self.best
    }

    fn save(&mut self, model: &Sequential) -> Result<(), TrainingError> {
        if let Some(parent) = self.filepath.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(IoError::StdIoError)?;
            }
        }

        if self.save_weights_only {
            model.save_to_path(&self.filepath)?;
        } else {
            model.save_model(&self.filepath)?;
        }
        self.saves += 1;
        Ok(())
    }
}

impl Callback for ModelCheckpoint {
    fn on_train_begin(&mut self, _model: &Sequential) -> Result<(), TrainingError> {
        self.best = self.monitor.initial_best();
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        logs: &EpochLogs,
        model: &mut Sequential,
    ) -> Result<CallbackAction, TrainingError> {
        if !self.save_best_only {
            self.save(model)?;
            return Ok(CallbackAction::Continue);
        }

        let Some(current) = logs.get(&self.monitor) else {
            debug!(
                "Epoch {}: {} not available, checkpoint skipped",
                logs.epoch + 1,
                self.monitor
            );
            return Ok(CallbackAction::Continue);
        };

        if self.monitor.is_improvement(current, self.best, 0.0) {
            info!(
                "Epoch {}: {} improved from {:.5} to {:.5}, saving model to {}",
                logs.epoch + 1,
                self.monitor,
                self.best,
                current,
                self.filepath.display()
            );
            self.best = current;
            self.save(model)?;
        } else {
            debug!(
                "Epoch {}: {} did not improve from {:.5}",
                logs.epoch + 1,
                self.monitor,
                self.best
            );
        }

        Ok(CallbackAction::Continue)
    }

    fn monitor(&self) -> Option<Monitor> {
        self.save_best_only.then_some(self.monitor)
    }
}
