use crate::error::{IoError, ModelError, TrainingError};
use crate::metric::Metric;
use crate::neural_network::layer::{LayerConfig, LayerWeight, SerializableLayerWeight};
use crate::neural_network::{
    Callback, CallbackAction, Dataset, EpochLogs, History, Layer, LossFunction, Optimizer, Tensor,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use ndarray::{Array2, Ix2};
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Options for [`Sequential::fit_dataset`].
///
/// # Fields
///
/// - `epochs` - Maximum number of epochs
/// - `batch_size` - Rows per training and validation batch
/// - `steps_per_epoch` - Batches per epoch drawn from the repeating training stream;
///   `None` means one full pass
/// - `validation_data` - Held-out data evaluated after every epoch
/// - `validation_steps` - Validation batches per evaluation; `None` means one full pass
/// - `shuffle_seed` - Reshuffle training order every pass, seeded; `None` keeps the order
/// - `callbacks` - Callbacks run after every epoch, in order
/// - `verbose` - Show a progress bar
pub struct FitOptions<'a> {
    pub epochs: usize,
    pub batch_size: usize,
    pub steps_per_epoch: Option<usize>,
    pub validation_data: Option<&'a Dataset>,
    pub validation_steps: Option<usize>,
    pub shuffle_seed: Option<u64>,
    pub callbacks: Vec<Box<dyn Callback>>,
    pub verbose: bool,
}

impl<'a> FitOptions<'a> {
    /// Options for `epochs` epochs with batch size 32 and nothing else attached.
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: 32,
            steps_per_epoch: None,
            validation_data: None,
            validation_steps: None,
            shuffle_seed: None,
            callbacks: Vec::new(),
            verbose: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_steps_per_epoch(mut self, steps: Option<usize>) -> Self {
        self.steps_per_epoch = steps;
        self
    }

    pub fn with_validation(mut self, data: &'a Dataset, steps: Option<usize>) -> Self {
        self.validation_data = Some(data);
        self.validation_steps = steps;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.shuffle_seed = seed;
        self
    }

    pub fn with_callback<C: 'static + Callback>(mut self, callback: C) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Loss (including weight penalties) and metric values over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub metrics: Vec<(Metric, f32)>,
}

/// A Sequential neural network model for building and training feedforward networks.
///
/// The Sequential model allows you to build neural networks by stacking layers in a linear fashion.
/// Each layer feeds its output to the next layer in sequence.
///
/// # Example
/// ```rust
/// use modelsmith::prelude::*;
/// use ndarray::Array;
///
/// let x = Array::ones((32, 8)).into_dyn();
/// let y = Array::ones((32, 3)).into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Dense::new(8, 16, Activation::ReLU))
///     .add(Dense::new(16, 3, Activation::Softmax))
///     .compile(
///         Adam::default_with_lr(0.01).unwrap(),
///         CategoricalCrossEntropy::new(),
///         vec![Metric::CategoricalAccuracy],
///     );
///
/// model.summary();
/// model.fit(&x, &y, 5).unwrap();
///
/// let predictions = model.predict(&x).unwrap();
/// assert_eq!(predictions.shape(), &[32, 3]);
/// ```
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Box<dyn Optimizer>>,
    loss: Option<Box<dyn LossFunction>>,
    metrics: Vec<Metric>,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequential {
    /// Creates a new empty Sequential model
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            optimizer: None,
            loss: None,
            metrics: Vec::new(),
        }
    }

    /// Adds a layer to the model
    ///
    /// Supports method chaining pattern
    pub fn add<L: 'static + Layer>(&mut self, layer: L) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Configures the optimizer, loss function and reported metrics
    ///
    /// # Parameters
    ///
    /// - `optimizer` - The optimizer to use for training
    /// - `loss` - The loss function to use for training
    /// - `metrics` - Metrics computed and reported every epoch
    ///
    /// # Returns
    ///
    /// * `&mut Sequential` - Mutable reference to self for method chaining
    pub fn compile<O, LFunc>(&mut self, optimizer: O, loss: LFunc, metrics: Vec<Metric>) -> &mut Self
    where
        O: 'static + Optimizer,
        LFunc: 'static + LossFunction,
    {
        self.optimizer = Some(Box::new(optimizer));
        self.loss = Some(Box::new(loss));
        self.metrics = metrics;
        self
    }

    pub fn is_compiled(&self) -> bool {
        self.optimizer.is_some() && self.loss.is_some()
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn loss_name(&self) -> Option<&str> {
        self.loss.as_ref().map(|l| l.name())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Input width expected by the first layer.
    pub fn input_dim(&self) -> Option<usize> {
        self.layers.first().map(|layer| match layer.config() {
            LayerConfig::Dense { input_dim, .. } => input_dim,
        })
    }

    /// Output width produced by the last layer.
    pub fn output_dim(&self) -> Option<usize> {
        self.layers.last().map(|layer| match layer.config() {
            LayerConfig::Dense { output_dim, .. } => output_dim,
        })
    }

    /// Sum of the weight penalties of all layers.
    pub fn regularization_loss(&self) -> f32 {
        self.layers.iter().map(|l| l.regularization_loss()).sum()
    }

    fn validate_compiled(&self) -> Result<(), ModelError> {
        if self.optimizer.is_none() {
            return Err(ModelError::InputValidationError(
                "Optimizer not specified".to_string(),
            ));
        }

        if self.loss.is_none() {
            return Err(ModelError::InputValidationError(
                "Loss function not specified".to_string(),
            ));
        }

        if self.layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "Layers not specified".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the model state and input data
    fn validate_training_inputs(&self, x: &Tensor, y: &Tensor) -> Result<(), ModelError> {
        self.validate_compiled()?;

        if x.is_empty() || y.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensors cannot be empty".to_string(),
            ));
        }

        if x.shape()[0] != y.shape()[0] {
            return Err(ModelError::InputValidationError(format!(
                "Batch size mismatch: input has {} samples, target has {} samples",
                x.shape()[0],
                y.shape()[0]
            )));
        }

        Ok(())
    }

    fn validate_dataset(&self, data: &Dataset, role: &str) -> Result<(), ModelError> {
        if let Some(input_dim) = self.input_dim() {
            if data.n_features() != input_dim {
                return Err(ModelError::InputValidationError(format!(
                    "{} data has {} features, model expects {}",
                    role,
                    data.n_features(),
                    input_dim
                )));
            }
        }
        if let Some(output_dim) = self.output_dim() {
            if data.n_outputs() != output_dim {
                return Err(ModelError::InputValidationError(format!(
                    "{} labels have {} columns, model outputs {}",
                    role,
                    data.n_outputs(),
                    output_dim
                )));
            }
        }
        Ok(())
    }

    fn forward(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let mut output = x.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output)?;
        }
        Ok(output)
    }

    /// Performs training on a single batch of data
    ///
    /// # Returns
    ///
    /// - `Ok((f32, Tensor))` - Loss including weight penalties, and the batch predictions
    /// - `Err(ModelError)` - If the model is not compiled or a layer fails
    fn train_batch(&mut self, x: &Tensor, y: &Tensor) -> Result<(f32, Tensor), ModelError> {
        let output = self.forward(x)?;

        let (loss_value, mut grad) = match self.loss.as_ref() {
            Some(loss) => (loss.compute_loss(y, &output), loss.compute_grad(y, &output)),
            None => {
                return Err(ModelError::InputValidationError(
                    "Loss function not specified".to_string(),
                ));
            }
        };
        let loss_value = loss_value + self.regularization_loss();

        let optimizer = self.optimizer.as_mut().ok_or_else(|| {
            ModelError::InputValidationError("Optimizer not specified".to_string())
        })?;
        optimizer.step();

        // Backward pass and parameter updates (iterate through layers in reverse)
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
            optimizer.update(&mut **layer);
        }

        Ok((loss_value, output))
    }

    fn compute_metrics(&self, y: &Tensor, y_pred: &Tensor) -> Result<Vec<f32>, ModelError> {
        if self.metrics.is_empty() {
            return Ok(Vec::new());
        }
        let y_2d = to_2d(y)?;
        let pred_2d = to_2d(y_pred)?;
        self.metrics
            .iter()
            .map(|m| m.compute(&y_2d, &pred_2d))
            .collect()
    }

    /// Trains the model on the whole input as a single batch for `epochs` epochs.
    ///
    /// # Parameters
    ///
    /// - `x` - Input tensor containing training data
    /// - `y` - Target tensor containing expected outputs
    /// - `epochs` - Number of training epochs to perform
    pub fn fit(&mut self, x: &Tensor, y: &Tensor, epochs: u32) -> Result<&mut Self, ModelError> {
        self.validate_training_inputs(x, y)?;

        let progress_bar = epoch_progress_bar(epochs as u64, false);

        for _ in 0..epochs {
            let (loss_value, _) = self.train_batch(x, y)?;

            progress_bar.set_message(format!("{:.6}", loss_value));
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();

        debug!(
            "Neural network training completed: {} samples, {} epochs",
            x.shape()[0],
            epochs
        );

        Ok(self)
    }

    /// Trains the model with shuffled mini-batches for `epochs` full passes.
    ///
    /// # Parameters
    ///
    /// - `x` - Input training data, shape (n_samples, n_features)
    /// - `y` - Target data, shape (n_samples, n_outputs)
    /// - `epochs` - Number of training epochs
    /// - `batch_size` - Size of each training batch
    pub fn fit_with_batches(
        &mut self,
        x: &Tensor,
        y: &Tensor,
        epochs: u32,
        batch_size: usize,
    ) -> Result<&mut Self, ModelError> {
        self.validate_training_inputs(x, y)?;

        let n_samples = x.shape()[0];
        if batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if batch_size > n_samples {
            return Err(ModelError::InputValidationError(format!(
                "Batch size ({}) cannot be larger than dataset size ({})",
                batch_size, n_samples
            )));
        }

        let dataset = Dataset::new(to_2d(x)?, to_2d(y)?)?;
        let steps = dataset.steps_per_pass(batch_size);
        let mut stream = dataset.stream(batch_size, Some(rand::random::<u64>()));

        let progress_bar = epoch_progress_bar(epochs as u64, false);
        for epoch in 0..epochs {
            let mut epoch_loss = 0.0;
            for _ in 0..steps {
                if let Some((batch_x, batch_y)) = stream.next() {
                    let (batch_loss, _) = self.train_batch(&batch_x, &batch_y)?;
                    epoch_loss += batch_loss;
                }
            }
            progress_bar.set_message(format!(
                "{}/{} | Avg Loss: {:.6}",
                epoch + 1,
                epochs,
                epoch_loss / steps as f32
            ));
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        Ok(self)
    }

    /// Trains the model on a dataset with optional validation and callbacks.
    ///
    /// Each epoch draws `steps_per_epoch` batches from an endlessly repeating
    /// stream over `train` (one full pass when unset), then evaluates
    /// `validation_steps` batches of the validation data (one full pass when
    /// unset). Reported losses include weight penalties. Callbacks see every
    /// epoch and may stop training.
    ///
    /// # Returns
    ///
    /// - `Ok(History)` - Per-epoch losses and metrics
    /// - `Err(TrainingError::Model)` - Invalid options or data, or the loss became non-finite.
    ///   A non-finite loss ends training like a stop request: callbacks still get
    ///   `on_train_end` (so early stopping can restore its best weights) before the error is returned
    /// - `Err(TrainingError::Io)` - A callback failed to write to disk
    pub fn fit_dataset(
        &mut self,
        train: &Dataset,
        options: FitOptions<'_>,
    ) -> Result<History, TrainingError> {
        let FitOptions {
            epochs,
            batch_size,
            steps_per_epoch,
            validation_data,
            validation_steps,
            shuffle_seed,
            mut callbacks,
            verbose,
        } = options;

        self.validate_compiled()?;
        self.validate_dataset(train, "Training")?;
        if let Some(valid) = validation_data {
            self.validate_dataset(valid, "Validation")?;
        }
        if batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "Batch size must be greater than 0".to_string(),
            )
            .into());
        }
        if steps_per_epoch == Some(0) || validation_steps == Some(0) {
            return Err(ModelError::InputValidationError(
                "steps_per_epoch and validation_steps must be greater than 0".to_string(),
            )
            .into());
        }
        if validation_data.is_none() {
            if let Some(monitor) = callbacks
                .iter()
                .filter_map(|cb| cb.monitor())
                .find(|m| m.requires_validation())
            {
                return Err(ModelError::InputValidationError(format!(
                    "A callback monitors '{}' but no validation data was provided",
                    monitor
                ))
                .into());
            }
        }

        let steps = steps_per_epoch.unwrap_or_else(|| train.steps_per_pass(batch_size));
        let mut stream = train.stream(batch_size, shuffle_seed);
        let mut history = History::new(&self.metrics);

        for callback in callbacks.iter_mut() {
            callback.on_train_begin(self)?;
        }

        let progress_bar = epoch_progress_bar(epochs as u64, verbose);
        let mut diverged = None;

        for epoch in 0..epochs {
            let mut loss_sum = 0.0f32;
            let mut metric_sums = vec![0.0f32; self.metrics.len()];
            let mut seen = 0usize;

            for _ in 0..steps {
                let Some((batch_x, batch_y)) = stream.next() else {
                    break;
                };
                let rows = batch_x.shape()[0];
                let (batch_loss, output) = self.train_batch(&batch_x, &batch_y)?;
                let batch_metrics = self.compute_metrics(&batch_y, &output)?;

                loss_sum += batch_loss * rows as f32;
                for (sum, value) in metric_sums.iter_mut().zip(batch_metrics) {
                    *sum += value * rows as f32;
                }
                seen += rows;
            }

            let denom = seen.max(1) as f32;
            let loss = loss_sum / denom;
            if !loss.is_finite() {
                warn!("Training loss became non-finite at epoch {}, stopping", epoch + 1);
                history.stopped_epoch = Some(epoch);
                diverged = Some(ModelError::ProcessingError(format!(
                    "Training loss became non-finite at epoch {}",
                    epoch + 1
                )));
                break;
            }

            let (val_loss, val_metrics) = match validation_data {
                Some(valid) => {
                    let evaluation = self.evaluate_stream(valid, validation_steps, batch_size)?;
                    (Some(evaluation.loss), evaluation.metrics)
                }
                None => (None, Vec::new()),
            };

            let logs = EpochLogs {
                epoch,
                loss,
                val_loss,
                metrics: self
                    .metrics
                    .iter()
                    .copied()
                    .zip(metric_sums.into_iter().map(|s| s / denom))
                    .collect(),
                val_metrics,
            };
            history.record_epoch(&logs);

            debug!(
                "Epoch {}/{}: loss={:.6} val_loss={}",
                epoch + 1,
                epochs,
                logs.loss,
                logs.val_loss
                    .map_or_else(|| "n/a".to_string(), |v| format!("{:.6}", v))
            );
            progress_bar.set_message(format!("{}/{} | Loss: {:.6}", epoch + 1, epochs, loss));
            progress_bar.inc(1);

            let mut stop = false;
            for callback in callbacks.iter_mut() {
                if callback.on_epoch_end(&logs, self)? == CallbackAction::StopTraining {
                    stop = true;
                }
            }
            if stop {
                history.stopped_epoch = Some(epoch);
                break;
            }
        }

        // also runs after a divergence, before the error is returned
        for callback in callbacks.iter_mut() {
            callback.on_train_end(self)?;
        }

        progress_bar.finish_and_clear();
        if let Some(err) = diverged {
            return Err(err.into());
        }
        info!(
            "Training finished after {} epoch(s), final loss {:.6}",
            history.epochs_run,
            history.final_loss().unwrap_or(f32::NAN)
        );

        Ok(history)
    }

    fn evaluate_stream(
        &mut self,
        data: &Dataset,
        steps: Option<usize>,
        batch_size: usize,
    ) -> Result<Evaluation, ModelError> {
        if self.loss.is_none() {
            return Err(ModelError::InputValidationError(
                "Loss function not specified".to_string(),
            ));
        }

        let steps = steps.unwrap_or_else(|| data.steps_per_pass(batch_size));
        let mut loss_sum = 0.0f32;
        let mut metric_sums = vec![0.0f32; self.metrics.len()];
        let mut seen = 0usize;

        for (batch_x, batch_y) in data.stream(batch_size, None).take(steps) {
            let rows = batch_x.shape()[0];
            let output = self.forward(&batch_x)?;
            let batch_loss = match self.loss.as_ref() {
                Some(loss) => loss.compute_loss(&batch_y, &output),
                None => 0.0,
            };
            let batch_metrics = self.compute_metrics(&batch_y, &output)?;

            loss_sum += batch_loss * rows as f32;
            for (sum, value) in metric_sums.iter_mut().zip(batch_metrics) {
                *sum += value * rows as f32;
            }
            seen += rows;
        }

        let denom = seen.max(1) as f32;
        Ok(Evaluation {
            loss: loss_sum / denom + self.regularization_loss(),
            metrics: self
                .metrics
                .iter()
                .copied()
                .zip(metric_sums.into_iter().map(|s| s / denom))
                .collect(),
        })
    }

    /// Computes loss (with weight penalties) and compiled metrics over a dataset.
    ///
    /// # Parameters
    ///
    /// - `data` - Dataset to evaluate
    /// - `batch_size` - Rows per evaluation batch
    ///
    /// # Returns
    ///
    /// - `Ok(Evaluation)` - Loss and metric values
    /// - `Err(ModelError)` - If the model is not compiled or the data does not fit the model
    pub fn evaluate(&mut self, data: &Dataset, batch_size: usize) -> Result<Evaluation, ModelError> {
        self.validate_compiled()?;
        self.validate_dataset(data, "Evaluation")?;
        self.evaluate_stream(data, None, batch_size.max(1))
    }

    /// Generates predictions for the input data
    ///
    /// Only performs forward pass without any training
    ///
    /// # Parameters
    ///
    /// * `x` - Input tensor containing data to predict on
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - Tensor containing the model's predictions
    /// - `Err(ModelError)` - If the input is empty or does not fit the first layer
    pub fn predict(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        if x.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensor cannot be empty".to_string(),
            ));
        }
        if self.layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "Layers not specified".to_string(),
            ));
        }
        self.forward(x)
    }

    /// Prints a summary of the model's structure
    ///
    /// Displays each layer's information and parameter statistics in a tabular format
    pub fn summary(&self) {
        let col1_width = 33;
        let col2_width = 24;
        let col3_width = 15;
        println!("Model: \"sequential\"");
        println!(
            "┏{}┳{}┳{}┓",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );
        println!(
            "┃ {:<31} ┃ {:<22} ┃ {:>13} ┃",
            "Layer (type)", "Output Shape", "Param #"
        );
        println!(
            "┡{}╇{}╇{}┩",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );

        let total = self.param_count();
        for (i, layer) in self.layers.iter().enumerate() {
            let layer_name = if i == 0 {
                "dense".to_string()
            } else {
                format!("dense_{}", i)
            };
            println!(
                "│ {:<31} │ {:<22} │ {:>13} │",
                format!("{} ({})", layer_name, layer.layer_type()),
                layer.output_shape(),
                layer.param_count()
            );
        }
        println!(
            "└{}┴{}┴{}┘",
            "─".repeat(col1_width),
            "─".repeat(col2_width),
            "─".repeat(col3_width)
        );
        // f32 parameters, 4 bytes each
        println!(" Total params: {} ({} B)", total, total * 4);
    }

    /// Total number of trainable parameters.
    pub fn param_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.param_count()).sum()
    }

    /// Returns borrowed views of the weights of every layer.
    pub fn get_weights(&self) -> Vec<LayerWeight<'_>> {
        self.layers.iter().map(|layer| layer.get_weights()).collect()
    }

    /// Copies the weights of every layer.
    pub fn snapshot_weights(&self) -> Vec<SerializableLayerWeight> {
        self.layers
            .iter()
            .map(|layer| SerializableLayerWeight::from_layer_weight(&layer.get_weights()))
            .collect()
    }

    /// Puts back weights taken with [`Sequential::snapshot_weights`].
    ///
    /// # Returns
    ///
    /// - `Ok(())` - All layers restored
    /// - `Err(ModelError::InputValidationError)` - Layer count or a layer's shape differs
    pub fn restore_weights(&mut self, weights: &[SerializableLayerWeight]) -> Result<(), ModelError> {
        if weights.len() != self.layers.len() {
            return Err(ModelError::InputValidationError(format!(
                "Layer count mismatch: model has {} layers, snapshot has {}",
                self.layers.len(),
                weights.len()
            )));
        }
        for (layer, w) in self.layers.iter_mut().zip(weights) {
            layer.set_weights(w)?;
        }
        Ok(())
    }

    /// Saves the weights of every layer to a JSON file.
    ///
    /// The architecture is recorded only as layer type names, so the file can
    /// be applied to an identically built model with [`Sequential::load_from_path`].
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights written
    /// - `Err(IoError)` - File creation, write or serialization failed
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let serializable = SerializableWeights {
            layers: self
                .layers
                .iter()
                .map(|layer| SerializableWeightEntry {
                    layer_type: layer.layer_type().to_string(),
                    weights: SerializableLayerWeight::from_layer_weight(&layer.get_weights()),
                })
                .collect(),
        };
        write_json(path.as_ref(), &serializable)
    }

    /// Loads weights written by [`Sequential::save_to_path`] into this model.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights applied
    /// - `Err(IoError::ModelStructureMismatch)` - Layer count, type or shape differs
    /// - `Err(IoError)` - File could not be read or parsed
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let file = File::open(path.as_ref())?;
        let stored: SerializableWeights = from_reader(BufReader::new(file))?;

        if stored.layers.len() != self.layers.len() {
            return Err(IoError::ModelStructureMismatch(format!(
                "Layer count mismatch: model has {} layers, file has {} layers",
                self.layers.len(),
                stored.layers.len()
            )));
        }

        for (i, (layer, entry)) in self.layers.iter_mut().zip(&stored.layers).enumerate() {
            if layer.layer_type() != entry.layer_type {
                return Err(IoError::ModelStructureMismatch(format!(
                    "Layer {} type mismatch: model has {}, file has {}",
                    i,
                    layer.layer_type(),
                    entry.layer_type
                )));
            }
            layer
                .set_weights(&entry.weights)
                .map_err(|e| IoError::ModelStructureMismatch(format!("Layer {}: {}", i, e)))?;
        }

        Ok(())
    }

    /// Saves architecture, metrics and weights to a JSON file.
    ///
    /// Optimizer state is not saved; a model returned by [`Sequential::load_model`]
    /// predicts right away and needs `compile` before further training.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let serializable = SerializableModel {
            loss: self.loss_name().map(str::to_string),
            metrics: self.metrics.clone(),
            layers: self
                .layers
                .iter()
                .map(|layer| SerializableModelLayer {
                    config: layer.config(),
                    weights: SerializableLayerWeight::from_layer_weight(&layer.get_weights()),
                })
                .collect(),
        };
        write_json(path.as_ref(), &serializable)
    }

    /// Rebuilds a model written by [`Sequential::save_model`].
    ///
    /// # Returns
    ///
    /// - `Ok(Sequential)` - The rebuilt, uncompiled model (its metric list is restored)
    /// - `Err(IoError)` - File could not be read or parsed, or weights do not fit the architecture
    pub fn load_model(path: impl AsRef<Path>) -> Result<Sequential, IoError> {
        let file = File::open(path.as_ref())?;
        let stored: SerializableModel = from_reader(BufReader::new(file))?;

        let mut model = Sequential::new();
        for (i, entry) in stored.layers.iter().enumerate() {
            let mut layer = entry.config.build();
            layer
                .set_weights(&entry.weights)
                .map_err(|e| IoError::ModelStructureMismatch(format!("Layer {}: {}", i, e)))?;
            model.layers.push(layer);
        }
        model.metrics = stored.metrics;

        if let Some(loss) = stored.loss {
            debug!("Loaded model was compiled with loss '{}'", loss);
        }
        Ok(model)
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableWeightEntry {
    layer_type: String,
    weights: SerializableLayerWeight,
}

#[derive(Serialize, Deserialize)]
struct SerializableWeights {
    layers: Vec<SerializableWeightEntry>,
}

#[derive(Serialize, Deserialize)]
struct SerializableModelLayer {
    config: LayerConfig,
    weights: SerializableLayerWeight,
}

#[derive(Serialize, Deserialize)]
struct SerializableModel {
    loss: Option<String>,
    metrics: Vec<Metric>,
    layers: Vec<SerializableModelLayer>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn to_2d(t: &Tensor) -> Result<Array2<f32>, ModelError> {
    t.view()
        .into_dimensionality::<Ix2>()
        .map(|v| v.to_owned())
        .map_err(|_| {
            ModelError::InputValidationError(format!(
                "Expected a 2D tensor (samples, features), got shape {:?}",
                t.shape()
            ))
        })
}

fn epoch_progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let progress_bar = ProgressBar::new(len);
    match ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Epoch {msg}")
    {
        Ok(style) => progress_bar.set_style(style.progress_chars("█▓░")),
        Err(e) => warn!("Progress bar template rejected: {}", e),
    }
    progress_bar
}
