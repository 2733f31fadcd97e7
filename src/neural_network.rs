/// Module that contains activation function implementations
pub mod activation;
/// Module that contains training callbacks (checkpointing, early stopping)
pub mod callback;
/// Module that contains dataset batching for training loops
pub mod dataset;
/// Module that contains per-epoch training records
pub mod history;
/// Module that contains kernel initializers
pub mod initializer;
/// Module that contains neural network layer implementations
pub mod layer;
/// Module that contains loss function implementations
pub mod loss_function;
/// Module that contains the layer, loss and optimizer traits
pub mod neural_network_trait;
/// Module that contains optimization algorithms for neural network training
pub mod optimizer;
/// Module that contains kernel weight penalties
pub mod regularizer;
/// Module that contains implementations for sequential model architecture
pub mod sequential;

pub use activation::*;
pub use callback::*;
pub use dataset::*;
pub use history::*;
pub use initializer::*;
pub use layer::*;
pub use loss_function::*;
pub use neural_network_trait::*;
pub use optimizer::*;
pub use regularizer::*;
pub use sequential::*;

use ndarray::ArrayD;

/// Type alias for n-dimensional arrays used as tensors in the neural network
pub type Tensor = ArrayD<f32>;
