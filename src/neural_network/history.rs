use crate::metric::Metric;
use serde::{Deserialize, Serialize};

/// What a callback watches: a loss or a compiled metric, on training or validation data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Monitor {
    Loss,
    ValLoss,
    Metric(Metric),
    ValMetric(Metric),
}

impl Monitor {
    /// Key of the monitored quantity, e.g. `"val_loss"` or `"val_categorical_accuracy"`.
    pub fn name(&self) -> String {
        match self {
            Monitor::Loss => "loss".to_string(),
            Monitor::ValLoss => "val_loss".to_string(),
            Monitor::Metric(m) => m.name().to_string(),
            Monitor::ValMetric(m) => format!("val_{}", m.name()),
        }
    }

    /// Whether the quantity is computed on validation data.
    pub fn requires_validation(&self) -> bool {
        matches!(self, Monitor::ValLoss | Monitor::ValMetric(_))
    }

    /// Whether larger values are better (accuracy) rather than smaller (losses, errors).
    pub fn higher_is_better(&self) -> bool {
        match self {
            Monitor::Loss | Monitor::ValLoss => false,
            Monitor::Metric(m) | Monitor::ValMetric(m) => m.higher_is_better(),
        }
    }

    /// Worst possible value, used before the first epoch.
    pub fn initial_best(&self) -> f32 {
        if self.higher_is_better() {
            f32::NEG_INFINITY
        } else {
            f32::INFINITY
        }
    }

    /// Whether `current` beats `best` by more than `min_delta`.
    pub fn is_improvement(&self, current: f32, best: f32, min_delta: f32) -> bool {
        if self.higher_is_better() {
            current - min_delta > best
        } else {
            current + min_delta < best
        }
    }
}

impl std::fmt::Display for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Quantities reported at the end of one epoch.
///
/// # Fields
///
/// - `epoch` - 0-based epoch index
/// - `loss` - Sample-weighted mean training loss, including weight penalties
/// - `val_loss` - Validation loss, when validation data was supplied
/// - `metrics` - Training value of each compiled metric
/// - `val_metrics` - Validation value of each compiled metric
#[derive(Debug, Clone, PartialEq)]
pub struct EpochLogs {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
    pub metrics: Vec<(Metric, f32)>,
    pub val_metrics: Vec<(Metric, f32)>,
}

impl EpochLogs {
    /// Value of the monitored quantity, if it was computed this epoch.
    pub fn get(&self, monitor: &Monitor) -> Option<f32> {
        match monitor {
            Monitor::Loss => Some(self.loss),
            Monitor::ValLoss => self.val_loss,
            Monitor::Metric(m) => lookup(&self.metrics, m),
            Monitor::ValMetric(m) => lookup(&self.val_metrics, m),
        }
    }
}

fn lookup(values: &[(Metric, f32)], metric: &Metric) -> Option<f32> {
    values.iter().find(|(m, _)| m == metric).map(|(_, v)| *v)
}

/// Record of a training run, one entry per completed epoch.
///
/// # Fields
///
/// - `loss` / `val_loss` - Loss curves (`val_loss` is empty without validation data)
/// - `metrics` / `val_metrics` - One curve per compiled metric, in compile order
/// - `epochs_run` - Number of completed epochs
/// - `stopped_epoch` - Epoch at which a callback requested the stop, if any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub loss: Vec<f32>,
    pub val_loss: Vec<f32>,
    pub metrics: Vec<(Metric, Vec<f32>)>,
    pub val_metrics: Vec<(Metric, Vec<f32>)>,
    pub epochs_run: usize,
    pub stopped_epoch: Option<usize>,
}

impl History {
    /// Creates an empty history for a model compiled with `metrics`.
    pub fn new(metrics: &[Metric]) -> Self {
        Self {
            metrics: metrics.iter().map(|m| (*m, Vec::new())).collect(),
            val_metrics: metrics.iter().map(|m| (*m, Vec::new())).collect(),
            ..Default::default()
        }
    }

    /// Appends the logs of one epoch.
    pub fn record_epoch(&mut self, logs: &EpochLogs) {
        self.loss.push(logs.loss);
        if let Some(val_loss) = logs.val_loss {
            self.val_loss.push(val_loss);
        }
        for (metric, curve) in self.metrics.iter_mut() {
            if let Some(v) = lookup(&logs.metrics, metric) {
                curve.push(v);
            }
        }
        for (metric, curve) in self.val_metrics.iter_mut() {
            if let Some(v) = lookup(&logs.val_metrics, metric) {
                curve.push(v);
            }
        }
        self.epochs_run += 1;
    }

    /// Curve recorded for the monitored quantity.
    pub fn curve(&self, monitor: &Monitor) -> Option<&[f32]> {
        let find = |curves: &'_ [(Metric, Vec<f32>)], m: &Metric| -> Option<usize> {
            curves.iter().position(|(metric, _)| metric == m)
        };
        match monitor {
            Monitor::Loss => Some(&self.loss),
            Monitor::ValLoss => Some(&self.val_loss),
            Monitor::Metric(m) => find(&self.metrics, m).map(|i| self.metrics[i].1.as_slice()),
            Monitor::ValMetric(m) => {
                find(&self.val_metrics, m).map(|i| self.val_metrics[i].1.as_slice())
            }
        }
    }

    /// Lowest validation loss and the epoch it was reached (first on ties).
    pub fn best_val_loss(&self) -> Option<(usize, f32)> {
        self.val_loss
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (epoch, v)| match best {
                Some((_, b)) if v >= b => best,
                _ => Some((epoch, v)),
            })
    }

    /// Training loss of the last completed epoch.
    pub fn final_loss(&self) -> Option<f32> {
        self.loss.last().copied()
    }

    pub fn stopped_early(&self) -> bool {
        self.stopped_epoch.is_some()
    }
}
