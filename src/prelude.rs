/// Prelude module for machine learning functionality.
#[cfg(feature = "machine_learning")]
pub mod machine_learning_prelude;
/// Prelude module for evaluation metrics.
#[cfg(feature = "metric")]
pub mod metric_prelude;
/// Prelude module for neural network functionality.
#[cfg(feature = "neural_network")]
pub mod neural_network_prelude;
/// Prelude module for the training entry points and their configuration.
#[cfg(feature = "training")]
pub mod training_prelude;

pub use crate::error::*;
#[cfg(feature = "machine_learning")]
pub use machine_learning_prelude::*;
#[cfg(feature = "metric")]
pub use metric_prelude::*;
#[cfg(feature = "neural_network")]
pub use neural_network_prelude::*;
#[cfg(feature = "training")]
pub use training_prelude::*;
