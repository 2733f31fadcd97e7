use super::input_validation_function::{
    validate_decay_rate, validate_epsilon, validate_learning_rate,
};
use crate::error::ModelError;
use crate::neural_network::{Layer, Optimizer};
use ndarray::Array2;

/// Adam optimizer implementation.
///
/// An optimization algorithm that computes individual adaptive learning
/// rates for different parameters from estimates of first and second moments
/// of the gradients.
///
/// The step counter `t` advances once per training batch, so every layer of
/// the model sees the same bias correction within a step.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Step size for parameter updates
    /// - `beta1` - Decay rate for the first moment estimates (typically 0.9)
    /// - `beta2` - Decay rate for the second moment estimates (typically 0.999)
    /// - `epsilon` - Small constant for numerical stability (typically 1e-7)
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new Adam optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If any hyperparameter is out of range
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        validate_decay_rate(beta1, "beta1")?;
        validate_decay_rate(beta2, "beta2")?;
        validate_epsilon(epsilon)?;

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
        })
    }

    /// Adam with beta1 = 0.9, beta2 = 0.999, epsilon = 1e-7 and the given learning rate.
    pub fn default_with_lr(learning_rate: f32) -> Result<Self, ModelError> {
        Self::new(learning_rate, 0.9, 0.999, 1e-7)
    }

    /// Number of optimization steps taken so far.
    pub fn iterations(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, layer: &mut dyn Layer) {
        // a step must precede the first update so bias correction never divides by zero
        let t = self.t.max(1);
        layer.update_parameters_adam(self.learning_rate, self.beta1, self.beta2, self.epsilon, t);
    }

    fn step(&mut self) {
        self.t += 1;
    }
}

/// Stores and manages optimization state for the Adam optimizer algorithm.
///
/// # Fields
///
/// - `m` - First moment (moving average of gradients) for the kernel
/// - `v` - Second moment (moving average of squared gradients) for the kernel
/// - `m_bias` - First moment for the bias
/// - `v_bias` - Second moment for the bias
#[derive(Debug, Clone, Default)]
pub struct AdamStates {
    pub m: Array2<f32>,
    pub v: Array2<f32>,
    pub m_bias: Array2<f32>,
    pub v_bias: Array2<f32>,
}

impl AdamStates {
    /// Creates a new Adam state object, initialized to zero
    ///
    /// # Parameters
    ///
    /// - `dims_param` - Dimensions (rows, columns) of the kernel
    /// - `dims_bias` - Dimensions (rows, columns) of the bias
    pub fn new(dims_param: (usize, usize), dims_bias: (usize, usize)) -> Self {
        Self {
            m: Array2::zeros(dims_param),
            v: Array2::zeros(dims_param),
            m_bias: Array2::zeros(dims_bias),
            v_bias: Array2::zeros(dims_bias),
        }
    }

    /// Updates the moment estimates and calculates the parameter steps
    ///
    /// # Parameters
    ///
    /// - `grad_param` - Gradient of the kernel
    /// - `grad_bias` - Gradient of the bias
    /// - `beta1` - Exponential decay rate for first moment estimates
    /// - `beta2` - Exponential decay rate for second moment estimates
    /// - `epsilon` - Small constant added for numerical stability
    /// - `t` - Current timestep (1-based)
    /// - `lr` - Learning rate
    ///
    /// # Returns
    ///
    /// - `(Array2<f32>, Array2<f32>)` - Steps to subtract from the kernel and the bias
    pub fn update_parameter(
        &mut self,
        grad_param: &Array2<f32>,
        grad_bias: &Array2<f32>,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        t: u64,
        lr: f32,
    ) -> (Array2<f32>, Array2<f32>) {
        Self::update_adam_param(&mut self.m, &mut self.v, grad_param, beta1, beta2);
        Self::update_adam_param(&mut self.m_bias, &mut self.v_bias, grad_bias, beta1, beta2);

        let correction1 = Self::bias_correction(beta1, t);
        let correction2 = Self::bias_correction(beta2, t);

        let (param_update, bias_update) = rayon::join(
            || {
                let m_hat = self.m.mapv(|x| x / correction1);
                let v_hat = self.v.mapv(|x| x / correction2);
                lr * &m_hat / &(v_hat.mapv(f32::sqrt) + epsilon)
            },
            || {
                let m_hat = self.m_bias.mapv(|x| x / correction1);
                let v_hat = self.v_bias.mapv(|x| x / correction2);
                lr * &m_hat / &(v_hat.mapv(f32::sqrt) + epsilon)
            },
        );

        (param_update, bias_update)
    }

    /// `1 - beta^t`; steps past `i32::MAX` are clamped, where the power is already 0.
    fn bias_correction(beta: f32, t: u64) -> f32 {
        let t = i32::try_from(t).unwrap_or(i32::MAX);
        1.0 - beta.powi(t)
    }

    /// m = beta1*m + (1-beta1)*g, v = beta2*v + (1-beta2)*g²
    fn update_adam_param(
        m: &mut Array2<f32>,
        v: &mut Array2<f32>,
        g: &Array2<f32>,
        beta1: f32,
        beta2: f32,
    ) {
        let (m_updated, v_updated) = rayon::join(
            || m.mapv(|x| x * beta1) + &(g * (1.0 - beta1)),
            || v.mapv(|x| x * beta2) + &(g.mapv(|x| x * x) * (1.0 - beta2)),
        );

        *m = m_updated;
        *v = v_updated;
    }
}
