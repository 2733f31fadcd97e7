use crate::error::ModelError;
use crate::neural_network::layer::{
    DenseLayerWeight, LayerConfig, LayerWeight, SerializableLayerWeight, vec2_to_array2,
};
use crate::neural_network::optimizer::{AdamStates, SGD};
use crate::neural_network::{Activation, Initializer, Layer, Regularizer, Tensor};
use ndarray::{Array2, Axis, Ix2};

/// Dense (Fully Connected) layer implementation for neural networks.
///
/// This layer performs a linear transformation of the input data using a weight matrix and bias vector,
/// followed by an activation function: output = activation(input * weights + bias).
///
/// Kernels are initialized with Glorot uniform by default (see [`Initializer`]); a seeded
/// initializer makes the initial weights reproducible. Bias values start at zero.
/// An optional kernel regularizer adds its penalty to the training loss and its gradient
/// to the kernel gradient.
///
/// # Dimensions
///
/// - Input shape: (batch_size, input_dim)
/// - Output shape: (batch_size, output_dim)
///
/// # Example
/// ```rust
/// use ndarray::Array;
/// use modelsmith::prelude::*;
///
/// let x = Array::ones((2, 4)).into_dyn();
/// let y = Array::ones((2, 1)).into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(
///         Dense::new(4, 3, Activation::ReLU)
///             .with_kernel_initializer(Initializer::glorot_uniform_seeded(7))
///             .with_kernel_regularizer(Regularizer::L2(1e-4)),
///     )
///     .add(Dense::new(3, 1, Activation::Linear))
///     .compile(SGD::new(0.01).unwrap(), MeanSquaredError::new(), vec![]);
///
/// model.fit(&x, &y, 3).unwrap();
/// let prediction = model.predict(&x).unwrap();
/// assert_eq!(prediction.shape(), &[2, 1]);
/// ```
pub struct Dense {
    input_dim: usize,
    output_dim: usize,
    /// Weight matrix with shape (input_dim, output_dim)
    weights: Array2<f32>,
    /// Bias vector with shape (1, output_dim)
    bias: Array2<f32>,
    input_cache: Option<Array2<f32>>,
    grad_weights: Option<Array2<f32>>,
    grad_bias: Option<Array2<f32>>,
    adam_states: Option<AdamStates>,
    activation: Activation,
    /// Cached output after activation for use in backward pass
    activation_output: Option<Array2<f32>>,
    kernel_regularizer: Option<Regularizer>,
}

impl Dense {
    /// Creates a new dense layer with Glorot-uniform kernel and zero bias.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Number of input features
    /// - `output_dim` - Number of units
    /// - `activation` - Activation applied to the affine output
    ///
    /// # Returns
    ///
    /// * `Self` - A new Dense layer instance with specified dimensions
    pub fn new(input_dim: usize, output_dim: usize, activation: Activation) -> Self {
        Self {
            input_dim,
            output_dim,
            weights: Initializer::default().initialize(input_dim, output_dim),
            bias: Array2::zeros((1, output_dim)),
            input_cache: None,
            grad_weights: None,
            grad_bias: None,
            adam_states: None,
            activation,
            activation_output: None,
            kernel_regularizer: None,
        }
    }

    /// Re-initializes the kernel with the given initializer.
    pub fn with_kernel_initializer(mut self, initializer: Initializer) -> Self {
        self.weights = initializer.initialize(self.input_dim, self.output_dim);
        self
    }

    /// Attaches a kernel regularizer.
    pub fn with_kernel_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.kernel_regularizer = Some(regularizer);
        self
    }

    /// Returns the activation function of the layer.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Replaces kernel and bias.
    ///
    /// # Parameters
    ///
    /// - `weights` - Kernel with shape (input_dim, output_dim)
    /// - `bias` - Bias with shape (1, output_dim)
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights replaced
    /// - `Err(ModelError::InputValidationError)` - A shape does not match the layer
    pub fn set_dense_weights(
        &mut self,
        weights: Array2<f32>,
        bias: Array2<f32>,
    ) -> Result<(), ModelError> {
        if weights.dim() != (self.input_dim, self.output_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Dense kernel shape mismatch: expected {:?}, got {:?}",
                (self.input_dim, self.output_dim),
                weights.dim()
            )));
        }
        if bias.dim() != (1, self.output_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Dense bias shape mismatch: expected {:?}, got {:?}",
                (1, self.output_dim),
                bias.dim()
            )));
        }
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }
}

impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        let input_2d = input
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| {
                ModelError::InputValidationError(format!(
                    "Dense layer expects a 2D input (batch_size, {}), got shape {:?}",
                    self.input_dim,
                    input.shape()
                ))
            })?
            .to_owned();

        if input_2d.ncols() != self.input_dim {
            return Err(ModelError::InputValidationError(format!(
                "Dense layer expects {} input features, got {}",
                self.input_dim,
                input_2d.ncols()
            )));
        }

        // ndarray runs dot through its matrixmultiply backend
        let z = input_2d.dot(&self.weights) + &self.bias;
        let a = self.activation.apply_activation(&z);

        self.input_cache = Some(input_2d);
        self.activation_output = Some(a.clone());
        Ok(a.into_dyn())
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let grad_upstream = grad_output
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| {
                ModelError::ProcessingError(format!(
                    "Dense layer expects a 2D gradient, got shape {:?}",
                    grad_output.shape()
                ))
            })?
            .to_owned();

        let a = self.activation_output.take().ok_or_else(|| {
            ModelError::ProcessingError(String::from("Forward pass has not been run"))
        })?;
        let input = self.input_cache.take().ok_or_else(|| {
            ModelError::ProcessingError(String::from("Forward pass has not been run"))
        })?;

        let grad_z = self.activation.backward(&a, &grad_upstream);

        let mut grad_w = input.t().dot(&grad_z);
        if let Some(regularizer) = &self.kernel_regularizer {
            grad_w += &regularizer.gradient(&self.weights);
        }
        let grad_b = grad_z.sum_axis(Axis(0)).insert_axis(Axis(0));

        let grad_input = grad_z.dot(&self.weights.t());

        self.grad_weights = Some(grad_w);
        self.grad_bias = Some(grad_b);

        Ok(grad_input.into_dyn())
    }

    fn layer_type(&self) -> &str {
        "Dense"
    }

    fn output_shape(&self) -> String {
        format!("(None, {})", self.output_dim)
    }

    fn param_count(&self) -> usize {
        self.input_dim * self.output_dim + self.output_dim
    }

    fn update_parameters_sgd(&mut self, lr: f32) {
        if let (Some(grad_w), Some(grad_b)) = (&self.grad_weights, &self.grad_bias) {
            if let (Some(w), Some(gw), Some(b), Some(gb)) = (
                self.weights.as_slice_mut(),
                grad_w.as_slice(),
                self.bias.as_slice_mut(),
                grad_b.as_slice(),
            ) {
                SGD::update_sgd_parameters(w, gw, b, gb, lr);
            }
        }
    }

    fn update_parameters_adam(&mut self, lr: f32, beta1: f32, beta2: f32, epsilon: f32, t: u64) {
        if let (Some(grad_w), Some(grad_b)) = (&self.grad_weights, &self.grad_bias) {
            let states = self.adam_states.get_or_insert_with(|| {
                AdamStates::new((self.input_dim, self.output_dim), (1, self.output_dim))
            });
            let (w_update, b_update) =
                states.update_parameter(grad_w, grad_b, beta1, beta2, epsilon, t, lr);

            self.weights -= &w_update;
            self.bias -= &b_update;
        }
    }

    fn regularization_loss(&self) -> f32 {
        self.kernel_regularizer
            .as_ref()
            .map_or(0.0, |regularizer| regularizer.penalty(&self.weights))
    }

    fn get_weights(&self) -> LayerWeight<'_> {
        LayerWeight::Dense(DenseLayerWeight {
            weight: &self.weights,
            bias: &self.bias,
        })
    }

    fn set_weights(&mut self, weights: &SerializableLayerWeight) -> Result<(), ModelError> {
        let SerializableLayerWeight::Dense(w) = weights;
        let weight = vec2_to_array2(&w.weight)?;
        let bias = vec2_to_array2(&w.bias)?;
        self.set_dense_weights(weight, bias)
    }

    fn config(&self) -> LayerConfig {
        LayerConfig::Dense {
            input_dim: self.input_dim,
            output_dim: self.output_dim,
            activation: self.activation,
            kernel_regularizer: self.kernel_regularizer,
        }
    }
}
