/// Dense (fully connected) layer
pub mod dense;
/// Serializable architecture description of layers
pub mod layer_config;
/// Borrowed views of layer weights
pub mod layer_weight;
/// Owned, serializable layer weights
pub mod serialize_weight;

pub use dense::*;
pub use layer_config::*;
pub use layer_weight::*;
pub use serialize_weight::*;
