/// Categorical Cross Entropy loss function for multi-class classification
pub mod categorical_cross_entropy;
/// Mean Squared Error loss function
pub mod mean_squared_error;

pub use categorical_cross_entropy::*;
pub use mean_squared_error::*;
