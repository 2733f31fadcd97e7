use ndarray::{Array2, Axis, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Rows above which softmax is evaluated in parallel.
const SOFTMAX_PARALLEL_THRESHOLD: usize = 8;

/// Activation function enum, supporting ReLU, Linear, Sigmoid, and Softmax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    ReLU,
    Linear,
    Sigmoid,
    Softmax,
}

impl Activation {
    /// Lower-case name used in summaries and saved models.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
        }
    }

    /// Forward application of activation functions
    ///
    /// Applies the activation function to the pre-activation matrix `z`.
    /// Softmax is applied row-wise and shifted by the row maximum.
    ///
    /// # Parameters
    ///
    /// * `z` - Input matrix with shape (batch_size, units)
    ///
    /// # Returns
    ///
    /// * `Array2<f32>` - A new matrix with the activation function applied
    pub fn apply_activation(&self, z: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::ReLU => {
                let mut result = z.clone();
                result.par_mapv_inplace(|x| if x > 0.0 { x } else { 0.0 });
                result
            }
            Activation::Linear => z.clone(),
            Activation::Sigmoid => {
                let mut result = z.clone();
                result.par_mapv_inplace(|x| 1.0 / (1.0 + (-x).exp()));
                result
            }
            Activation::Softmax => {
                let mut out = z.clone();

                if out.nrows() > SOFTMAX_PARALLEL_THRESHOLD {
                    out.axis_iter_mut(Axis(0))
                        .into_par_iter()
                        .for_each(|mut row| {
                            let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                            row.mapv_inplace(|x| (x - max_val).exp());
                            let sum = row.sum();
                            row.mapv_inplace(|x| x / sum);
                        });
                } else {
                    for mut row in out.outer_iter_mut() {
                        let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                        row.mapv_inplace(|x| (x - max_val).exp());
                        let sum = row.sum();
                        row.mapv_inplace(|x| x / sum);
                    }
                }
                out
            }
        }
    }

    /// Computes derivatives for the element-wise activation functions
    ///
    /// Returns the derivative of the activation function given the activated output.
    /// For Softmax, the gradient is handled by [`Activation::softmax_backward`].
    ///
    /// # Parameters
    ///
    /// * `activation_output` - The output after activation function has been applied
    ///
    /// # Returns
    ///
    /// * `Array2<f32>` - A matrix containing the derivative values
    pub fn activation_derivative(&self, activation_output: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::ReLU => activation_output.mapv(|x| if x > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => activation_output.mapv(|a| a * (1.0 - a)),
            Activation::Linear | Activation::Softmax => Array2::ones(activation_output.dim()),
        }
    }

    /// Backward propagation for Softmax activation
    ///
    /// For each row, computes:
    /// new_grad\[i\] = a\[i\] * (upstream\[i\] - sum_j(a\[j\]*upstream\[j\]))
    ///
    /// # Parameters
    ///
    /// - `a` - The output from the softmax activation
    /// - `upstream` - The gradient flowing from the next layer
    ///
    /// # Returns
    ///
    /// * `Array2<f32>` - The gradient with respect to the input of the softmax function
    pub fn softmax_backward(a: &Array2<f32>, upstream: &Array2<f32>) -> Array2<f32> {
        let mut result = Array2::<f32>::zeros(a.raw_dim());

        Zip::from(result.axis_iter_mut(Axis(0)))
            .and(a.axis_iter(Axis(0)))
            .and(upstream.axis_iter(Axis(0)))
            .par_for_each(|mut out_row, a_row, up_row| {
                let dot = a_row
                    .iter()
                    .zip(up_row.iter())
                    .map(|(&ai, &gi)| ai * gi)
                    .sum::<f32>();

                for (j, r) in out_row.iter_mut().enumerate() {
                    *r = a_row[j] * (up_row[j] - dot);
                }
            });

        result
    }

    /// Chains the upstream gradient through this activation.
    ///
    /// # Parameters
    ///
    /// - `activation_output` - Output of the forward pass
    /// - `upstream` - Gradient with respect to the activation output
    ///
    /// # Returns
    ///
    /// * `Array2<f32>` - Gradient with respect to the pre-activation values
    pub fn backward(&self, activation_output: &Array2<f32>, upstream: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Softmax => Self::softmax_backward(activation_output, upstream),
            Activation::Linear => upstream.clone(),
            _ => self.activation_derivative(activation_output) * upstream,
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
