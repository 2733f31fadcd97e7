use crate::neural_network::{LossFunction, Tensor};

/// Predictions are clipped to [EPSILON, 1 - EPSILON] before taking logarithms.
const EPSILON: f32 = 1e-7;

/// Categorical Cross Entropy loss function for multi-class classification
///
/// Targets are one-hot (or probability) rows; the loss is
/// `-Σ y_true * ln(y_pred)` averaged over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Creates a new instance of CategoricalCrossEntropy
    pub fn new() -> Self {
        Self
    }
}

impl LossFunction for CategoricalCrossEntropy {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        let y_pred_clipped = y_pred.mapv(|x| x.clamp(EPSILON, 1.0 - EPSILON));

        let losses = y_true * &y_pred_clipped.mapv(f32::ln);

        // first axis is the batch
        let n = y_true.shape()[0] as f32;
        -losses.sum() / n
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        let y_pred_clipped = y_pred.mapv(|x| x.clamp(EPSILON, 1.0 - EPSILON));

        let grad = -y_true / &y_pred_clipped;

        let n = y_true.shape()[0] as f32;
        grad / n
    }

    fn name(&self) -> &str {
        "categorical_crossentropy"
    }
}
