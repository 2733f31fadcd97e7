/// Error types shared by every module: `ModelError`, `IoError` and `TrainingError`
pub mod error;

/// A macro that generates a getter method for any field.
///
/// This macro creates a public getter method that returns the value of the specified field.
/// The generated method includes appropriate documentation describing the field being accessed.
///
/// # Parameters
///
/// - `$method_name` - The name of the getter method (e.g., get_n_components)
/// - `$field_name` - The name of the field to access (e.g., n_components)
/// - `$return_type` - The return type of the getter method
#[cfg(feature = "machine_learning")]
macro_rules! get_field {
    ($method_name:ident, $field_name:ident, $return_type:ty) => {
        #[doc = concat!("Gets the `", stringify!($field_name), "` field.\n\n")]
        #[doc = "# Returns\n\n"]
        #[doc = concat!("* `", stringify!($return_type), "` - The value of the `", stringify!($field_name), "` field")]
        pub fn $method_name(&self) -> $return_type {
            self.$field_name
        }
    };
}

/// A macro that generates a public getter method returning a reference to a field.
///
/// This macro creates a method that provides immutable reference access to an optional
/// private field in a struct.
///
/// # Parameters
///
/// - `$method_name` - The identifier for the generated getter method name
/// - `$field_name` - The identifier of the struct field to access
/// - `$return_type` - The type expression for the return value (typically `Option<&Type>`)
#[cfg(feature = "machine_learning")]
macro_rules! get_field_as_ref {
    ($method_name:ident, $field_name:ident, $return_type:ty) => {
        #[doc = concat!("Gets the `", stringify!($field_name), "` field.\n\n")]
        #[doc = "# Returns\n\n"]
        #[doc = concat!("* `", stringify!($return_type), "` - The value of the `", stringify!($field_name), "` field as a reference")]
        pub fn $method_name(&self) -> $return_type {
            self.$field_name.as_ref()
        }
    };
}

/// Evaluation metrics a network can be compiled with.
///
/// # Functions
/// - **mean_squared_error**: Average of squared differences between targets and predictions
/// - **r2_score**: Coefficient of determination, averaged over output columns
/// - **categorical_accuracy**: Share of rows whose predicted arg-max matches the one-hot target
///
/// `Metric` names one of these for `Sequential::compile` and the training history.
///
/// # Examples
/// ```rust
/// use modelsmith::metric::*;
/// use ndarray::array;
///
/// let y_true = array![[1.0f32, 0.0], [0.0, 1.0]];
/// let y_pred = array![[0.8f32, 0.2], [0.6, 0.4]];
/// assert_eq!(categorical_accuracy(&y_true, &y_pred).unwrap(), 0.5);
/// assert_eq!(Metric::CategoricalAccuracy.name(), "categorical_accuracy");
/// ```
#[cfg(feature = "metric")]
pub mod metric;

/// Clustering and mixture models over `f64` feature matrices.
///
/// # Models
/// - **KMeans**: K-means clustering with K-means++ initialization and parallel assignment
/// - **GaussianMixture**: Gaussian mixture fitted with EM, four covariance types,
///   parallel initializations, BIC and AIC
///
/// # Examples
/// ```rust
/// use modelsmith::machine_learning::*;
/// use ndarray::array;
///
/// let data = array![[1.0, 2.0], [1.5, 1.8], [8.0, 8.0], [8.2, 7.9]];
///
/// let mut kmeans = KMeans::new(2, 100, 1e-4, Some(42)).unwrap();
/// let labels = kmeans.fit_predict(&data).unwrap();
/// assert_eq!(labels[0], labels[1]);
///
/// let mut gmm = GaussianMixture::new(2, CovarianceType::Spherical, 2, 100, 1e-3, 1e-6, Some(2)).unwrap();
/// gmm.fit(&data).unwrap();
/// assert_eq!(gmm.get_weights().unwrap().len(), 2);
/// ```
#[cfg(feature = "machine_learning")]
pub mod machine_learning;

/// Components for building and training feed-forward neural networks.
///
/// # Core Components
///
/// ## Layers
/// - **Dense**: Fully connected layer with activation, Glorot-uniform initialization and optional L2 penalty
///
/// ## Optimization Algorithms
/// - **SGD**: Stochastic Gradient Descent
/// - **Adam**: Adaptive moment estimation optimizer
///
/// ## Loss Functions
/// - **MeanSquaredError**: For regression tasks
/// - **CategoricalCrossEntropy**: For multi-class classification over one-hot labels
///
/// ## Training
/// - **Dataset** / **BatchStream**: Batching over repeating, optionally shuffled data
/// - **Sequential**: Linear stack of layers with `fit`, `fit_dataset`, `evaluate`, `predict` and JSON persistence
/// - **ModelCheckpoint** / **EarlyStopping**: Callbacks run after every epoch
/// - **History**: Per-epoch losses and metrics
///
/// # Examples
/// ```rust
/// use modelsmith::neural_network::*;
/// use modelsmith::metric::Metric;
/// use ndarray::Array;
///
/// let x = Array::ones((2, 4)).into_dyn();
/// let y = Array::ones((2, 1)).into_dyn();
///
/// let mut model = Sequential::new();
/// model.add(Dense::new(4, 8, Activation::ReLU))
///      .add(Dense::new(8, 1, Activation::Linear));
///
/// model.compile(
///     Adam::new(0.001, 0.9, 0.999, 1e-7).unwrap(),
///     MeanSquaredError::new(),
///     vec![Metric::MeanSquaredError],
/// );
///
/// model.summary();
/// model.fit(&x, &y, 100).unwrap();
/// let predictions = model.predict(&x).unwrap();
/// assert_eq!(predictions.shape(), &[2, 1]);
/// ```
#[cfg(feature = "neural_network")]
pub mod neural_network;

/// Serializable settings of the training entry points, with the defaults they run with.
#[cfg(feature = "training")]
pub mod config;

/// Training entry points: the two-layer perceptron and the BIC-selected Gaussian mixture.
///
/// # Examples
/// ```rust
/// use modelsmith::config::TrainingConfig;
/// use modelsmith::training::{Task, create_model};
///
/// let config = TrainingConfig::default();
/// let model = create_model(6, Task::Regression, &config.mlp).unwrap();
/// assert_eq!(model.loss_name(), Some("mean_squared_error"));
/// ```
#[cfg(feature = "training")]
pub mod training;

/// A convenience module that re-exports the most commonly used types and traits from this crate.
///
/// # Examples
/// ```rust
/// use modelsmith::prelude::*;
///
/// let model = create_model(4, Task::Classification, &MlpConfig::default()).unwrap();
/// assert_eq!(model.metrics(), &[Metric::CategoricalAccuracy]);
/// ```
pub mod prelude;
