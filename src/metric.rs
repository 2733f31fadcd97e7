use crate::error::ModelError;
use ndarray::prelude::*;
use ndarray::{Data, Dimension};
use serde::{Deserialize, Serialize};

/// Calculates the Mean Squared Error between predicted and actual values.
///
/// Works on arrays of any dimensionality as long as both shapes agree; the
/// mean is taken over every element.
///
/// # Parameters
///
/// - `y_true` - Ground-truth values
/// - `y_pred` - Predicted values
///
/// # Examples
/// ```rust
/// use ndarray::array;
/// use modelsmith::metric::mean_squared_error;
///
/// let actual = array![3.0, -0.5, 2.0, 7.0];
/// let predicted = array![2.5, 0.0, 2.1, 7.8];
/// let mse = mean_squared_error(&actual, &predicted).unwrap();
/// assert!((mse - 0.2875).abs() < 1e-6);
/// ```
///
/// # Returns
///
/// - `Ok(f32)` - Mean squared error (0.0 when the inputs are empty)
/// - `Err(ModelError::InputValidationError)` - If the shapes differ
pub fn mean_squared_error<S, D>(
    y_true: &ArrayBase<S, D>,
    y_pred: &ArrayBase<S, D>,
) -> Result<f32, ModelError>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    check_same_shape(y_true.shape(), y_pred.shape())?;

    let n = y_true.len();
    if n == 0 {
        return Ok(0.0);
    }

    let sum_squared_diff = y_true
        .iter()
        .zip(y_pred.iter())
        .fold(0.0f32, |acc, (&actual, &pred)| {
            let error = actual - pred;
            acc + error * error
        });

    Ok(sum_squared_diff / n as f32)
}

/// Calculates the R² score (coefficient of determination) column-averaged over a 2-D target.
///
/// Each output column gets `1 - SSE / SST`; a constant column scores 1.0 when
/// predicted exactly and 0.0 otherwise.
///
/// # Parameters
///
/// - `y_true` - Ground-truth values with shape (n_samples, n_outputs)
/// - `y_pred` - Predicted values with the same shape
///
/// # Returns
///
/// - `Ok(f32)` - The uniform average of the per-column R² scores
/// - `Err(ModelError::InputValidationError)` - If the shapes differ or the input is empty
pub fn r2_score<S>(y_true: &ArrayBase<S, Ix2>, y_pred: &ArrayBase<S, Ix2>) -> Result<f32, ModelError>
where
    S: Data<Elem = f32>,
{
    check_same_shape(y_true.shape(), y_pred.shape())?;
    if y_true.is_empty() {
        return Err(ModelError::InputValidationError(
            "r2_score requires at least one sample".to_string(),
        ));
    }

    let mut total = 0.0f32;
    for (actual, predicted) in y_true.columns().into_iter().zip(y_pred.columns()) {
        // mean() is only None for empty lanes, excluded above
        let actual_mean = actual.mean().unwrap_or(0.0);
        let (sse, sst) = actual.iter().zip(predicted.iter()).fold(
            (0.0f32, 0.0f32),
            |(sse_acc, sst_acc), (&act, &pred)| {
                let error = pred - act;
                let deviation = act - actual_mean;
                (sse_acc + error * error, sst_acc + deviation * deviation)
            },
        );

        total += if sst < 1e-10 {
            if sse < 1e-10 { 1.0 } else { 0.0 }
        } else {
            1.0 - sse / sst
        };
    }

    Ok(total / y_true.ncols() as f32)
}

/// Calculates categorical accuracy for one-hot (or probability) targets.
///
/// A row counts as correct when the arg-max of the prediction equals the
/// arg-max of the target. Ties resolve to the lowest index.
///
/// # Examples
/// ```rust
/// use ndarray::array;
/// use modelsmith::metric::categorical_accuracy;
///
/// let y_true = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
/// let y_pred = array![[0.1, 0.8, 0.1], [0.2, 0.7, 0.1]];
/// assert_eq!(categorical_accuracy(&y_true, &y_pred).unwrap(), 0.5);
/// ```
///
/// # Returns
///
/// - `Ok(f32)` - Fraction of rows predicted correctly, in [0, 1]
/// - `Err(ModelError::InputValidationError)` - If the shapes differ or there are no rows
pub fn categorical_accuracy<S>(
    y_true: &ArrayBase<S, Ix2>,
    y_pred: &ArrayBase<S, Ix2>,
) -> Result<f32, ModelError>
where
    S: Data<Elem = f32>,
{
    check_same_shape(y_true.shape(), y_pred.shape())?;
    if y_true.nrows() == 0 {
        return Err(ModelError::InputValidationError(
            "categorical_accuracy requires at least one sample".to_string(),
        ));
    }

    let correct = y_true
        .outer_iter()
        .zip(y_pred.outer_iter())
        .filter(|(t, p)| argmax(t) == argmax(p))
        .count();

    Ok(correct as f32 / y_true.nrows() as f32)
}

/// Index of the largest element of a row, lowest index on ties.
pub(crate) fn argmax(row: &ArrayView1<f32>) -> usize {
    let mut best_idx = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in row.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    best_idx
}

fn check_same_shape(a: &[usize], b: &[usize]) -> Result<(), ModelError> {
    if a != b {
        return Err(ModelError::InputValidationError(format!(
            "Shape mismatch: y_true has shape {:?}, y_pred has shape {:?}",
            a, b
        )));
    }
    Ok(())
}

/// Metrics a network can be compiled with and that are reported per epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    MeanSquaredError,
    CategoricalAccuracy,
}

impl Metric {
    /// Key under which the metric is reported, e.g. `"mean_squared_error"`.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::CategoricalAccuracy => "categorical_accuracy",
        }
    }

    /// Whether a larger value of the metric means a better model.
    pub fn higher_is_better(&self) -> bool {
        matches!(self, Metric::CategoricalAccuracy)
    }

    /// Evaluates the metric on a batch of targets and predictions.
    ///
    /// # Parameters
    ///
    /// - `y_true` - Targets with shape (n_samples, n_outputs)
    /// - `y_pred` - Predictions with the same shape
    ///
    /// # Returns
    ///
    /// - `Ok(f32)` - The metric value
    /// - `Err(ModelError::InputValidationError)` - If the inputs are not compatible
    pub fn compute<S>(
        &self,
        y_true: &ArrayBase<S, Ix2>,
        y_pred: &ArrayBase<S, Ix2>,
    ) -> Result<f32, ModelError>
    where
        S: Data<Elem = f32>,
    {
        match self {
            Metric::MeanSquaredError => mean_squared_error(y_true, y_pred),
            Metric::CategoricalAccuracy => categorical_accuracy(y_true, y_pred),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
