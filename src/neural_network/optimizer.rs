/// Adam optimizer and its per-layer moment state
pub mod adam;
/// Shared hyperparameter validation
mod input_validation_function;
/// Stochastic Gradient Descent optimizer
pub mod sgd;

pub use adam::*;
pub use sgd::*;
