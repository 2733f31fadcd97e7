use ndarray::Array2;

/// Container for different types of neural network layer weights
///
/// # Variants
///
/// - `Dense` - Contains weights for dense (fully connected) layers
pub enum LayerWeight<'a> {
    Dense(DenseLayerWeight<'a>),
}

/// Weights for a dense (fully connected) neural network layer
///
/// # Fields
///
/// - `weight` - Weight matrix with shape (input_features, output_features)
/// - `bias` - Bias vector with shape (1, output_features)
pub struct DenseLayerWeight<'a> {
    pub weight: &'a Array2<f32>,
    pub bias: &'a Array2<f32>,
}
