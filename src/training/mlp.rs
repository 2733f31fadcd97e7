use crate::config::{FitConfig, MlpConfig};
use crate::error::{ModelError, TrainingError};
use crate::neural_network::{
    Activation, Adam, CategoricalCrossEntropy, Dataset, Dense, EarlyStopping, FitOptions, History,
    Initializer, MeanSquaredError, ModelCheckpoint, Monitor, Regularizer, Sequential,
};
use crate::training::Task;
use log::info;
use std::path::PathBuf;

/// Builds and compiles the two-layer perceptron for `task`.
///
/// Both Dense layers draw their kernels from a Glorot-uniform initializer seeded with
/// `config.seed` and carry an L2 kernel penalty of `config.l2`. The output layer is
/// linear for regression and softmax for classification. The network is compiled with
/// Adam at `config.learning_rate`.
///
/// # Parameters
///
/// - `input_dim` - Number of input features
/// - `task` - Regression or classification
/// - `config` - Widths, activation, learning rate, penalty and seed
///
/// # Returns
///
/// - `Ok(Sequential)` - The compiled, untrained network
/// - `Err(ModelError::InputValidationError)` - `input_dim` is 0 or the configuration is out of range
///
/// # Example
/// ```rust
/// use modelsmith::config::MlpConfig;
/// use modelsmith::training::{Task, create_model};
///
/// let model = create_model(4, Task::Classification, &MlpConfig::default()).unwrap();
/// assert_eq!(model.input_dim(), Some(4));
/// assert_eq!(model.output_dim(), Some(3));
/// assert_eq!(model.loss_name(), Some("categorical_crossentropy"));
/// ```
pub fn create_model(
    input_dim: usize,
    task: Task,
    config: &MlpConfig,
) -> Result<Sequential, ModelError> {
    if input_dim == 0 {
        return Err(ModelError::InputValidationError(
            "input_dim must be greater than 0".to_string(),
        ));
    }
    config.validate()?;

    let initializer = Initializer::glorot_uniform_seeded(config.seed);
    let regularizer = Regularizer::L2(config.l2);
    let output_activation = match task {
        Task::Regression => Activation::Linear,
        Task::Classification => Activation::Softmax,
    };

    let mut model = Sequential::new();
    model
        .add(
            Dense::new(input_dim, config.hidden_units, config.hidden_activation)
                .with_kernel_initializer(initializer)
                .with_kernel_regularizer(regularizer),
        )
        .add(
            Dense::new(config.hidden_units, config.output_units, output_activation)
                .with_kernel_initializer(initializer)
                .with_kernel_regularizer(regularizer),
        );

    let optimizer = Adam::default_with_lr(config.learning_rate)?;
    match task {
        Task::Regression => {
            model.compile(optimizer, MeanSquaredError::new(), vec![task.metric()]);
        }
        Task::Classification => {
            model.compile(
                optimizer,
                CategoricalCrossEntropy::new(),
                vec![task.metric()],
            );
        }
    }

    Ok(model)
}

/// Path of the checkpoint file written while training for `task`.
pub fn checkpoint_path(task: Task, config: &FitConfig) -> PathBuf {
    config
        .checkpoint_dir
        .join(format!("{}.json", task.checkpoint_name(config)))
}

/// Fits `model` on `train`, validating on `valid` after every epoch.
///
/// A [`ModelCheckpoint`] on `val_loss` writes to [`checkpoint_path`]. With
/// `config.early_stopping`, an [`EarlyStopping`] on `val_loss` with `config.patience`
/// ends training once the validation loss stalls and, with
/// `config.restore_best_weights`, leaves the best weights in `model`.
///
/// # Parameters
///
/// - `model` - A compiled network, typically from [`create_model`]
/// - `train` / `valid` - Training and validation data
/// - `steps_per_epoch` - Training batches per epoch over the repeating training data; `None` means one full pass
/// - `validation_steps` - Validation batches per epoch; `None` means one full pass
/// - `task` - Selects the checkpoint name
/// - `config` - Epochs, batching, early stopping and checkpoint settings
///
/// # Returns
///
/// - `Ok(History)` - Per-epoch training and validation curves
/// - `Err(TrainingError)` - Invalid configuration or data, a diverging loss, or a failed checkpoint write
pub fn train_mlp(
    model: &mut Sequential,
    train: &Dataset,
    valid: &Dataset,
    steps_per_epoch: Option<usize>,
    validation_steps: Option<usize>,
    task: Task,
    config: &FitConfig,
) -> Result<History, TrainingError> {
    config.validate()?;

    let checkpoint = ModelCheckpoint::new(checkpoint_path(task, config))
        .with_monitor(Monitor::ValLoss)
        .save_best_only(config.save_best_only)
        .save_weights_only(config.save_weights_only);

    let mut options = FitOptions::new(config.epochs)
        .with_batch_size(config.batch_size)
        .with_steps_per_epoch(steps_per_epoch)
        .with_validation(valid, validation_steps)
        .with_shuffle_seed(config.shuffle_seed)
        .with_callback(checkpoint);

    if config.early_stopping {
        options = options.with_callback(
            EarlyStopping::new(Monitor::ValLoss, config.patience)
                .restore_best_weights(config.restore_best_weights),
        );
    }

    info!("Training MLP...");
    let history = model.fit_dataset(train, options)?;

    match history.best_val_loss() {
        Some((epoch, val_loss)) => info!(
            "MLP {} training finished after {} epochs, best val_loss {:.6} at epoch {}",
            task,
            history.epochs_run,
            val_loss,
            epoch + 1
        ),
        None => info!(
            "MLP {} training finished after {} epochs",
            task, history.epochs_run
        ),
    }

    Ok(history)
}
