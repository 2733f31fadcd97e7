/// Mixture model selection by BIC
pub mod gmm;
/// Construction and training of the two-layer perceptron
pub mod mlp;

pub use gmm::*;
pub use mlp::*;

use crate::config::FitConfig;
use crate::metric::Metric;
use serde::{Deserialize, Serialize};

/// What the perceptron learns.
///
/// # Variants
///
/// - `Regression` - Linear output, mean squared error loss and metric
/// - `Classification` - Softmax output over one-hot labels, categorical cross-entropy loss, categorical accuracy metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Regression,
    Classification,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Regression => "regression",
            Task::Classification => "classification",
        }
    }

    /// Metric the network is compiled with.
    pub fn metric(&self) -> Metric {
        match self {
            Task::Regression => Metric::MeanSquaredError,
            Task::Classification => Metric::CategoricalAccuracy,
        }
    }

    /// Checkpoint file stem configured for this task.
    pub fn checkpoint_name<'a>(&self, config: &'a FitConfig) -> &'a str {
        match self {
            Task::Regression => &config.regression_checkpoint,
            Task::Classification => &config.classification_checkpoint,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
