use crate::neural_network::{LossFunction, Tensor};

/// Mean Squared Error loss function
///
/// The loss is averaged over every element of the batch, so the gradient is
/// `2 * (y_pred - y_true) / n_elements`.
///
/// # Example
///
/// ```rust
/// use modelsmith::neural_network::{LossFunction, MeanSquaredError};
/// use ndarray::ArrayD;
///
/// let mse = MeanSquaredError::new();
///
/// let y_true = ArrayD::from_shape_vec(vec![3, 1], vec![1.0, 2.0, 3.0]).unwrap();
/// let y_pred = ArrayD::from_shape_vec(vec![3, 1], vec![1.1, 2.2, 2.8]).unwrap();
///
/// let loss = mse.compute_loss(&y_true, &y_pred);
/// assert!((loss - 0.03).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    /// Creates a new instance of MeanSquaredError
    pub fn new() -> Self {
        Self
    }
}

impl LossFunction for MeanSquaredError {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        let squared_diff = (y_pred - y_true).mapv(|x| x * x);

        let n = squared_diff.len() as f32;
        squared_diff.sum() / n
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        let mut result = y_pred - y_true;

        let n = result.len() as f32;
        result.par_mapv_inplace(|x| 2.0 * x / n);

        result
    }

    fn name(&self) -> &str {
        "mean_squared_error"
    }
}
