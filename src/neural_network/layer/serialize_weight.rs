use super::*;
use crate::error::ModelError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Serializable weight container for all supported layer types.
///
/// # Variants
///
/// - `Dense` - Weights for a Dense layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SerializableLayerWeight {
    Dense(SerializableDenseWeight),
}

/// Serializable representation of Dense layer weights.
///
/// # Fields
///
/// - `weight` - 2D weight matrix stored as nested vectors
/// - `bias` - 2D bias matrix stored as nested vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableDenseWeight {
    pub weight: Vec<Vec<f32>>,
    pub bias: Vec<Vec<f32>>,
}

impl SerializableLayerWeight {
    /// Converts a `LayerWeight` reference into an owned serializable weight.
    ///
    /// # Parameters
    ///
    /// - `weight` - Layer weights to convert into a serializable form
    ///
    /// # Returns
    ///
    /// - `SerializableLayerWeight` - Serializable representation of the provided weights
    pub fn from_layer_weight(weight: &LayerWeight) -> Self {
        match weight {
            LayerWeight::Dense(w) => SerializableLayerWeight::Dense(SerializableDenseWeight {
                weight: w.weight.outer_iter().map(|row| row.to_vec()).collect(),
                bias: w.bias.outer_iter().map(|row| row.to_vec()).collect(),
            }),
        }
    }
}

/// Converts nested row vectors back into a 2D array.
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - The rebuilt matrix
/// - `Err(ModelError::InputValidationError)` - Rows have different lengths
pub fn vec2_to_array2(rows: &[Vec<f32>]) -> Result<Array2<f32>, ModelError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());

    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(ModelError::InputValidationError(
            "Weight rows have inconsistent lengths".to_string(),
        ));
    }

    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| ModelError::InputValidationError(format!("Invalid weight shape: {}", e)))
}
