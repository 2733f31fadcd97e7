#![cfg(feature = "neural_network")]

use approx::assert_abs_diff_eq;
use modelsmith::error::{IoError, ModelError, TrainingError};
use modelsmith::metric::Metric;
use modelsmith::neural_network::*;
use ndarray::{Array, Array2};

/// y = 2x + 1 sampled on [0, 2)
fn linear_data(n: usize) -> (Array2<f32>, Array2<f32>) {
    let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f32 / (n as f32 / 2.0));
    let y = x.mapv(|v| 2.0 * v + 1.0);
    (x, y)
}

/// Two separable classes in 2D, one-hot labels.
fn two_class_data(n: usize) -> (Array2<f32>, Array2<f32>) {
    let x = Array2::from_shape_fn((n, 2), |(i, j)| {
        let offset = if i % 2 == 0 { -1.0 } else { 1.0 };
        offset + 0.1 * ((i * 7 + j * 3) % 5) as f32
    });
    let y = Array2::from_shape_fn((n, 2), |(i, j)| if i % 2 == j { 1.0 } else { 0.0 });
    (x, y)
}

fn regression_model() -> Sequential {
    let mut model = Sequential::new();
    model
        .add(
            Dense::new(1, 8, Activation::ReLU)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(1234)),
        )
        .add(
            Dense::new(8, 1, Activation::Linear)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(1234)),
        )
        .compile(
            Adam::default_with_lr(0.01).unwrap(),
            MeanSquaredError::new(),
            vec![Metric::MeanSquaredError],
        );
    model
}

#[test]
fn fit_with_batches_test() {
    let x = Array::ones((100, 16)).into_dyn();
    let y = Array::ones((100, 4)).into_dyn();

    let mut model = Sequential::new();
    model
        .add(Dense::new(16, 8, Activation::ReLU))
        .add(Dense::new(8, 4, Activation::Softmax))
        .compile(
            Adam::new(0.001, 0.9, 0.999, 1e-7).unwrap(),
            CategoricalCrossEntropy::new(),
            vec![Metric::CategoricalAccuracy],
        );

    model.fit_with_batches(&x, &y, 1, 32).unwrap();
}

#[test]
fn test_fit_linear_regression_convergence() {
    let (x, y) = linear_data(100);
    let x = x.into_dyn();
    let y = y.into_dyn();

    let mut model = Sequential::new();
    model
        .add(Dense::new(1, 1, Activation::Linear))
        .compile(SGD::new(0.05).unwrap(), MeanSquaredError::new(), vec![]);

    let initial = model.predict(&x).unwrap();
    let initial_mse = (&initial - &y).mapv(|v| v * v).mean().unwrap();

    model.fit(&x, &y, 500).unwrap();

    let trained = model.predict(&x).unwrap();
    let trained_mse = (&trained - &y).mapv(|v| v * v).mean().unwrap();

    assert!(trained_mse < initial_mse);
    assert!(trained_mse < 0.05, "mse after training: {}", trained_mse);
}

#[test]
fn test_fit_without_compile_fails() {
    let mut model = Sequential::new();
    model.add(Dense::new(2, 1, Activation::Linear));
    let x = Array::ones((4, 2)).into_dyn();
    let y = Array::ones((4, 1)).into_dyn();
    assert!(matches!(
        model.fit(&x, &y, 1),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn test_fit_dataset_records_history() {
    let (x, y) = linear_data(64);
    let train = Dataset::new(x.clone(), y.clone()).unwrap();
    let valid = Dataset::new(x, y).unwrap();

    let mut model = regression_model();
    let history = model
        .fit_dataset(
            &train,
            FitOptions::new(5)
                .with_batch_size(16)
                .with_validation(&valid, None),
        )
        .unwrap();

    assert_eq!(history.epochs_run, 5);
    assert_eq!(history.loss.len(), 5);
    assert_eq!(history.val_loss.len(), 5);
    assert_eq!(history.metrics.len(), 1);
    assert_eq!(history.metrics[0].0, Metric::MeanSquaredError);
    assert_eq!(history.metrics[0].1.len(), 5);
    assert!(!history.stopped_early());
    assert!(history.best_val_loss().is_some());
    assert!(history.loss.iter().all(|l| l.is_finite()));
}

#[test]
fn test_reported_loss_includes_weight_penalty() {
    let (x, y) = linear_data(32);
    let data = Dataset::new(x, y).unwrap();

    let mut model = Sequential::new();
    model
        .add(
            Dense::new(1, 4, Activation::Linear)
                .with_kernel_regularizer(Regularizer::L2(0.5)),
        )
        .add(Dense::new(4, 1, Activation::Linear))
        .compile(
            SGD::new(0.01).unwrap(),
            MeanSquaredError::new(),
            vec![Metric::MeanSquaredError],
        );

    let evaluation = model.evaluate(&data, 32).unwrap();
    let mse = evaluation.metrics[0].1;
    assert_abs_diff_eq!(
        evaluation.loss,
        mse + model.regularization_loss(),
        epsilon = 1e-4
    );
    assert!(model.regularization_loss() > 0.0);
}

#[test]
fn test_validation_monitor_without_validation_data_fails() {
    let (x, y) = linear_data(16);
    let train = Dataset::new(x, y).unwrap();
    let mut model = regression_model();

    let result = model.fit_dataset(
        &train,
        FitOptions::new(3).with_callback(EarlyStopping::new(Monitor::ValLoss, 2)),
    );
    assert!(matches!(
        result,
        Err(TrainingError::Model(ModelError::InputValidationError(_)))
    ));
}

#[test]
fn test_fit_dataset_rejects_mismatched_data() {
    let train = Dataset::new(Array2::zeros((8, 3)), Array2::zeros((8, 1))).unwrap();
    let mut model = regression_model();
    assert!(model.fit_dataset(&train, FitOptions::new(1)).is_err());

    let (x, y) = linear_data(8);
    let train = Dataset::new(x, y).unwrap();
    assert!(model
        .fit_dataset(&train, FitOptions::new(1).with_batch_size(0))
        .is_err());
    assert!(model
        .fit_dataset(&train, FitOptions::new(1).with_steps_per_epoch(Some(0)))
        .is_err());
}

#[test]
fn test_steps_per_epoch_over_repeating_data() {
    let (x, y) = two_class_data(10);
    let train = Dataset::new(x.clone(), y.clone()).unwrap();
    let valid = Dataset::new(x, y).unwrap();

    let mut model = Sequential::new();
    model
        .add(Dense::new(2, 4, Activation::ReLU))
        .add(Dense::new(4, 2, Activation::Softmax))
        .compile(
            Adam::default_with_lr(0.01).unwrap(),
            CategoricalCrossEntropy::new(),
            vec![Metric::CategoricalAccuracy],
        );

    // 7 steps of 4 rows wrap around the 10-row dataset several times
    let history = model
        .fit_dataset(
            &train,
            FitOptions::new(3)
                .with_batch_size(4)
                .with_steps_per_epoch(Some(7))
                .with_validation(&valid, Some(2))
                .with_shuffle_seed(Some(5)),
        )
        .unwrap();

    assert_eq!(history.epochs_run, 3);
    let accuracy = history.curve(&Monitor::ValMetric(Metric::CategoricalAccuracy)).unwrap();
    assert_eq!(accuracy.len(), 3);
    assert!(accuracy.iter().all(|&a| (0.0..=1.0).contains(&a)));
}

#[test]
fn test_classifier_learns_separable_classes() {
    let (x, y) = two_class_data(40);
    let data = Dataset::new(x, y).unwrap();

    let mut model = Sequential::new();
    model
        .add(
            Dense::new(2, 8, Activation::ReLU)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(1234)),
        )
        .add(
            Dense::new(8, 2, Activation::Softmax)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(1234)),
        )
        .compile(
            Adam::default_with_lr(0.01).unwrap(),
            CategoricalCrossEntropy::new(),
            vec![Metric::CategoricalAccuracy],
        );

    model
        .fit_dataset(&data, FitOptions::new(100).with_batch_size(8))
        .unwrap();

    let evaluation = model.evaluate(&data, 40).unwrap();
    assert_eq!(evaluation.metrics[0].0, Metric::CategoricalAccuracy);
    assert!(evaluation.metrics[0].1 > 0.9, "accuracy: {}", evaluation.metrics[0].1);
}

#[test]
fn test_snapshot_and_restore_weights() {
    let (x, y) = linear_data(16);
    let mut model = regression_model();
    let snapshot = model.snapshot_weights();
    let before = model.predict(&x.clone().into_dyn()).unwrap();

    model.fit(&x.clone().into_dyn(), &y.into_dyn(), 20).unwrap();
    let after_training = model.predict(&x.clone().into_dyn()).unwrap();
    assert_ne!(before, after_training);

    model.restore_weights(&snapshot).unwrap();
    let restored = model.predict(&x.into_dyn()).unwrap();
    assert_eq!(before, restored);

    assert!(model.restore_weights(&snapshot[..1]).is_err());
}

#[test]
fn test_save_and_load_model_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let (x, y) = linear_data(16);
    let x = x.into_dyn();
    let mut model = regression_model();
    model.fit(&x, &y.into_dyn(), 10).unwrap();
    model.save_model(&path).unwrap();

    let mut loaded = Sequential::load_model(&path).unwrap();
    assert_eq!(loaded.layer_count(), 2);
    assert_eq!(loaded.input_dim(), Some(1));
    assert_eq!(loaded.output_dim(), Some(1));
    assert_eq!(loaded.metrics(), &[Metric::MeanSquaredError]);
    assert!(!loaded.is_compiled());

    let expected = model.predict(&x).unwrap();
    let actual = loaded.predict(&x).unwrap();
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, e, epsilon = 1e-6);
    }
}

#[test]
fn test_save_and_load_weights() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");

    let source = regression_model();
    source.save_to_path(&path).unwrap();

    let mut target = Sequential::new();
    target
        .add(Dense::new(1, 8, Activation::ReLU))
        .add(Dense::new(8, 1, Activation::Linear));
    target.load_from_path(&path).unwrap();
    assert_eq!(target.snapshot_weights(), source.snapshot_weights());

    let mut wrong = Sequential::new();
    wrong.add(Dense::new(1, 8, Activation::ReLU));
    assert!(matches!(
        wrong.load_from_path(&path),
        Err(IoError::ModelStructureMismatch(_))
    ));

    let mut wrong_shape = Sequential::new();
    wrong_shape
        .add(Dense::new(1, 4, Activation::ReLU))
        .add(Dense::new(4, 1, Activation::Linear));
    assert!(matches!(
        wrong_shape.load_from_path(&path),
        Err(IoError::ModelStructureMismatch(_))
    ));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Sequential::load_model(dir.path().join("absent.json")),
        Err(IoError::StdIoError(_))
    ));
}

#[test]
fn test_summary_and_param_count() {
    let model = regression_model();
    model.summary();
    // (1*8 + 8) + (8*1 + 1)
    assert_eq!(model.param_count(), 25);
}
