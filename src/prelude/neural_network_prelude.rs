pub use crate::neural_network::Tensor;
pub use crate::neural_network::activation::Activation;
pub use crate::neural_network::callback::*;
pub use crate::neural_network::dataset::{BatchStream, Dataset};
pub use crate::neural_network::history::{EpochLogs, History, Monitor};
pub use crate::neural_network::initializer::Initializer;
pub use crate::neural_network::layer::Dense;
pub use crate::neural_network::loss_function::{CategoricalCrossEntropy, MeanSquaredError};
pub use crate::neural_network::neural_network_trait::{Layer, LossFunction, Optimizer};
pub use crate::neural_network::optimizer::{Adam, SGD};
pub use crate::neural_network::regularizer::Regularizer;
pub use crate::neural_network::sequential::{Evaluation, FitOptions, Sequential};
