use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Kernel weight penalties added to the training loss.
///
/// `L2(factor)` contributes `factor * sum(w^2)` to the loss and
/// `2 * factor * w` to the kernel gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Regularizer {
    L2(f32),
}

impl Regularizer {
    /// Penalty value for the given kernel.
    pub fn penalty(&self, weights: &Array2<f32>) -> f32 {
        match *self {
            Regularizer::L2(factor) => factor * weights.iter().map(|w| w * w).sum::<f32>(),
        }
    }

    /// Gradient of the penalty with respect to the kernel.
    pub fn gradient(&self, weights: &Array2<f32>) -> Array2<f32> {
        match *self {
            Regularizer::L2(factor) => weights.mapv(|w| 2.0 * factor * w),
        }
    }
}
