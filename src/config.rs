use crate::error::{IoError, ModelError};
use crate::machine_learning::CovarianceType;
use crate::neural_network::Activation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Every knob of the two training entry points, loadable from a JSON file.
///
/// Missing fields fall back to their defaults, so `{}` is a valid configuration.
///
/// # Example
/// ```rust
/// use modelsmith::config::TrainingConfig;
///
/// let config: TrainingConfig = serde_json::from_str(r#"{ "fit": { "epochs": 50 } }"#).unwrap();
/// assert_eq!(config.fit.epochs, 50);
/// assert_eq!(config.fit.patience, 20);
/// assert_eq!(config.gmm.n_init, 100);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub mlp: MlpConfig,
    pub fit: FitConfig,
    pub gmm: GmmSweepConfig,
}

/// Architecture and optimizer of the two-layer perceptron.
///
/// # Fields
///
/// - `hidden_units` - Width of the hidden layer
/// - `output_units` - Width of the output layer
/// - `hidden_activation` - Activation of the hidden layer
/// - `learning_rate` - Adam learning rate
/// - `l2` - L2 factor applied to both kernels
/// - `seed` - Seed of the Glorot-uniform kernel initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub hidden_units: usize,
    pub output_units: usize,
    pub hidden_activation: Activation,
    pub learning_rate: f32,
    pub l2: f32,
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        MlpConfig {
            hidden_units: 128,
            output_units: 3,
            hidden_activation: Activation::ReLU,
            learning_rate: 0.01,
            l2: 1e-4,
            seed: 1234,
        }
    }
}

/// Fit loop settings: epochs, batching, early stopping and checkpointing.
///
/// # Fields
///
/// - `epochs` - Upper bound on epochs
/// - `batch_size` - Rows per batch
/// - `early_stopping` - Whether to stop once `val_loss` stalls
/// - `patience` - Epochs without improvement before stopping
/// - `restore_best_weights` - Put back the best weights when training ends
/// - `checkpoint_dir` - Directory holding the checkpoint files
/// - `regression_checkpoint` / `classification_checkpoint` - Checkpoint file stems per task
/// - `save_best_only` - Rewrite the checkpoint only when `val_loss` improves
/// - `save_weights_only` - Store weights without the architecture
/// - `shuffle_seed` - Reshuffle training batches every pass with this seed; `None` keeps the given order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub early_stopping: bool,
    pub patience: usize,
    pub restore_best_weights: bool,
    pub checkpoint_dir: PathBuf,
    pub regression_checkpoint: String,
    pub classification_checkpoint: String,
    pub save_best_only: bool,
    pub save_weights_only: bool,
    pub shuffle_seed: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            epochs: 1000,
            batch_size: 32,
            early_stopping: true,
            patience: 20,
            restore_best_weights: true,
            checkpoint_dir: PathBuf::from("checkpoints"),
            regression_checkpoint: "mlp_model_regression".to_string(),
            classification_checkpoint: "mlp_model_class".to_string(),
            save_best_only: true,
            save_weights_only: false,
            shuffle_seed: None,
        }
    }
}

/// Candidate grid and EM settings of the mixture sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmmSweepConfig {
    pub covariance_types: Vec<CovarianceType>,
    pub n_components: Vec<usize>,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub reg_covar: f64,
    pub random_state: Option<u64>,
}

impl Default for GmmSweepConfig {
    fn default() -> Self {
        GmmSweepConfig {
            covariance_types: CovarianceType::ALL.to_vec(),
            n_components: (1..=11).collect(),
            n_init: 100,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            random_state: Some(2),
        }
    }
}

impl GmmSweepConfig {
    /// Number of candidates the sweep fits.
    pub fn n_candidates(&self) -> usize {
        self.covariance_types.len() * self.n_components.len()
    }
}

fn invalid(msg: String) -> ModelError {
    ModelError::InputValidationError(msg)
}

impl TrainingConfig {
    /// Reads a configuration from a JSON file.
    ///
    /// # Returns
    ///
    /// - `Ok(TrainingConfig)` - The parsed configuration (not yet validated)
    /// - `Err(IoError)` - The file cannot be opened or is not valid JSON
    pub fn from_json_file(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        Ok(serde_json::from_reader(reader)?)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &str) -> Result<(), IoError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checks every value range.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The configuration can drive both entry points
    /// - `Err(ModelError::InputValidationError)` - The first offending field
    pub fn validate(&self) -> Result<(), ModelError> {
        self.mlp.validate()?;
        self.fit.validate()?;
        self.gmm.validate()
    }
}

impl MlpConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.hidden_units == 0 || self.output_units == 0 {
            return Err(invalid(format!(
                "hidden_units and output_units must be greater than 0, got {} and {}",
                self.hidden_units, self.output_units
            )));
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(invalid(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.l2 < 0.0 || !self.l2.is_finite() {
            return Err(invalid(format!(
                "l2 must be non-negative and finite, got {}",
                self.l2
            )));
        }
        Ok(())
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.epochs == 0 {
            return Err(invalid("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be greater than 0".to_string()));
        }
        if self.regression_checkpoint.is_empty() || self.classification_checkpoint.is_empty() {
            return Err(invalid("checkpoint names must not be empty".to_string()));
        }
        Ok(())
    }
}

impl GmmSweepConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.covariance_types.is_empty() || self.n_components.is_empty() {
            return Err(invalid(
                "The mixture sweep needs at least one covariance type and one component count"
                    .to_string(),
            ));
        }
        if self.n_components.contains(&0) {
            return Err(invalid("Component counts must be greater than 0".to_string()));
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(invalid(format!(
                "n_init and max_iter must be greater than 0, got {} and {}",
                self.n_init, self.max_iter
            )));
        }
        if self.tol <= 0.0 || !self.tol.is_finite() {
            return Err(invalid(format!(
                "tol must be positive and finite, got {}",
                self.tol
            )));
        }
        if self.reg_covar < 0.0 || !self.reg_covar.is_finite() {
            return Err(invalid(format!(
                "reg_covar must be non-negative and finite, got {}",
                self.reg_covar
            )));
        }
        Ok(())
    }
}
