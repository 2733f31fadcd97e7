use crate::neural_network::{Activation, Dense, Layer, Regularizer};
use serde::{Deserialize, Serialize};

/// Architecture of a single layer, as stored in full-model files.
///
/// Initializers are not part of the config: a rebuilt layer receives its
/// weights from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerConfig {
    Dense {
        input_dim: usize,
        output_dim: usize,
        activation: Activation,
        kernel_regularizer: Option<Regularizer>,
    },
}

impl LayerConfig {
    /// Builds a freshly initialized layer from the config.
    pub fn build(&self) -> Box<dyn Layer> {
        match self {
            LayerConfig::Dense {
                input_dim,
                output_dim,
                activation,
                kernel_regularizer,
            } => {
                let mut dense = Dense::new(*input_dim, *output_dim, *activation);
                if let Some(regularizer) = kernel_regularizer {
                    dense = dense.with_kernel_regularizer(*regularizer);
                }
                Box::new(dense)
            }
        }
    }
}
