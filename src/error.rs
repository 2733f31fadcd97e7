use std::fs::File;
use std::io::BufReader;
use thiserror::Error;

/// Error types that can occur during model operations
///
/// # Variants
///
/// - `NotFitted` - Indicates that the model has not been fitted yet
/// - `InputValidationError` - indicates the input data provided does not meet the expected format, type, or validation rules
/// - `ProcessingError` - indicates that there is something wrong while processing
/// - `ConvergenceError` - indicates that an iterative fitting procedure produced an unusable result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(
        "Model has not been fitted. Certain methods require the model to be fitted before use."
    )]
    NotFitted,
    #[error("Input validation error: {0}")]
    InputValidationError(String),
    #[error("Processing error: {0}")]
    ProcessingError(String),
    #[error("Convergence error: {0}")]
    ConvergenceError(String),
}

/// Input/Output error types that can occur during model serialization and file operations
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors when working with JSON data formats
/// - `ModelStructureMismatch` - The stored model does not match the structure of the model it is loaded into
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    StdIoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Model structure mismatch: {0}")]
    ModelStructureMismatch(String),
}

impl IoError {
    /// Opens `path` and wraps it in a buffered reader.
    pub fn load_in_buf_reader(path: &str) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

/// Errors raised by training loops that both compute and persist.
///
/// Training touches the numerical side (`ModelError`) and, through checkpoint
/// callbacks, the file system (`IoError`).
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Io(#[from] IoError),
}
