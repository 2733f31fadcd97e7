use crate::error::ModelError;
use ndarray::{ArrayBase, Data, Ix1, Ix2};

/// Performs validation checks on an input data matrix.
///
/// The matrix must contain at least one sample and only finite values.
///
/// # Parameters
///
/// * `x` - A 2D array of feature values where rows represent samples and columns represent features
///
/// # Returns
///
/// - `Ok(())` - If all validation checks pass
/// - `Err(ModelError::InputValidationError)` - If any validation check fails, with an informative error message
pub fn preliminary_check<S>(x: &ArrayBase<S, Ix2>) -> Result<(), ModelError>
where
    S: Data<Elem = f64>,
{
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::InputValidationError(
            "Input data is empty".to_string(),
        ));
    }

    for (i, row) in x.outer_iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(ModelError::InputValidationError(format!(
                    "Input data contains NaN or infinite value at position [{}][{}]",
                    i, j
                )));
            }
        }
    }

    Ok(())
}

/// Validates that the feature count of `x` matches a fitted model.
pub fn check_n_features<S>(x: &ArrayBase<S, Ix2>, expected: usize) -> Result<(), ModelError>
where
    S: Data<Elem = f64>,
{
    if x.ncols() != expected {
        return Err(ModelError::InputValidationError(format!(
            "Number of features does not match training data, x columns: {}, expected: {}",
            x.ncols(),
            expected
        )));
    }
    Ok(())
}

/// Validates that the maximum iterations parameter is greater than zero.
///
/// # Parameters
///
/// * `max_iterations` - The maximum number of iterations to validate
///
/// # Returns
///
/// - `Ok(())` - If the maximum iterations value is valid (greater than 0)
/// - `Err(ModelError::InputValidationError)` - If the maximum iterations value is 0
pub fn validate_max_iterations(max_iterations: usize) -> Result<(), ModelError> {
    if max_iterations == 0 {
        return Err(ModelError::InputValidationError(
            "max_iterations must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates that the tolerance parameter is positive and finite.
///
/// Iterative fitting stops when the change in its objective falls below this threshold.
///
/// # Parameters
///
/// * `tolerance` - The convergence tolerance value to validate
///
/// # Returns
///
/// - `Ok(())` - If the tolerance is valid (positive and finite)
/// - `Err(ModelError::InputValidationError)` - If the tolerance is invalid (non-positive, NaN, or infinite)
pub fn validate_tolerance(tolerance: f64) -> Result<(), ModelError> {
    if tolerance <= 0.0 || !tolerance.is_finite() {
        return Err(ModelError::InputValidationError(format!(
            "tolerance must be positive and finite, got {}",
            tolerance
        )));
    }

    Ok(())
}

/// Squared Euclidean distance between two rows.
pub fn squared_euclidean_distance_row<S1, S2>(
    x1: &ArrayBase<S1, Ix1>,
    x2: &ArrayBase<S2, Ix1>,
) -> f64
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    x1.iter()
        .zip(x2.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}
