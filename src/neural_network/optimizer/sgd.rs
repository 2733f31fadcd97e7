use super::input_validation_function::validate_learning_rate;
use crate::error::ModelError;
use crate::neural_network::{Layer, Optimizer};
use rayon::prelude::*;

/// Stochastic Gradient Descent (SGD) optimizer.
///
/// A simple optimization algorithm that updates parameters in the direction
/// of the negative gradient, scaled by the learning rate.
///
/// # Fields
///
/// * `learning_rate` - Learning rate controlling the size of parameter updates
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// Creates a new SGD optimizer with the specified learning rate.
    ///
    /// # Parameters
    ///
    /// * `learning_rate` - Step size for parameter updates
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new SGD optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If the learning rate is not positive and finite
    pub fn new(learning_rate: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        Ok(Self { learning_rate })
    }

    /// Simultaneously update two sets of parameters in parallel
    ///
    /// # Parameters
    ///
    /// - `weights` - Mutable reference to weights array to be updated
    /// - `weight_grads` - Reference to weight gradients array
    /// - `bias` - Mutable reference to bias array to be updated
    /// - `bias_grads` - Reference to bias gradients array
    /// - `lr` - Learning rate
    pub fn update_sgd_parameters(
        weights: &mut [f32],
        weight_grads: &[f32],
        bias: &mut [f32],
        bias_grads: &[f32],
        lr: f32,
    ) {
        rayon::join(
            || {
                weights
                    .par_iter_mut()
                    .zip(weight_grads.par_iter())
                    .for_each(|(w, wg)| {
                        *w -= *wg * lr;
                    });
            },
            || {
                bias.par_iter_mut()
                    .zip(bias_grads.par_iter())
                    .for_each(|(b, bg)| {
                        *b -= *bg * lr;
                    });
            },
        );
    }
}

impl Optimizer for SGD {
    fn update(&mut self, layer: &mut dyn Layer) {
        layer.update_parameters_sgd(self.learning_rate);
    }
}
