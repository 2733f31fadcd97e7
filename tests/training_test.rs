#![cfg(feature = "training")]

use modelsmith::config::{FitConfig, GmmSweepConfig, MlpConfig};
use modelsmith::error::{ModelError, TrainingError};
use modelsmith::machine_learning::CovarianceType;
use modelsmith::metric::Metric;
use modelsmith::neural_network::{Dataset, Monitor, Sequential};
use modelsmith::training::{Task, checkpoint_path, create_model, train_gmm, train_mlp};
use ndarray::{Array2, array};
use std::path::PathBuf;

fn small_mlp() -> MlpConfig {
    MlpConfig {
        hidden_units: 8,
        output_units: 1,
        ..MlpConfig::default()
    }
}

/// y = x0 - 2·x1 on a regular grid.
fn regression_split() -> (Dataset, Dataset) {
    let make = |offset: f32, n: usize| {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            ((i as f32 + offset) * if j == 0 { 0.13 } else { 0.07 }).sin()
        });
        let y = Array2::from_shape_fn((n, 1), |(i, _)| x[[i, 0]] - 2.0 * x[[i, 1]]);
        Dataset::new(x, y).unwrap()
    };
    (make(0.0, 48), make(0.5, 16))
}

fn two_blobs() -> Array2<f64> {
    array![
        [0.0, 0.1],
        [0.2, -0.1],
        [-0.1, 0.0],
        [0.1, 0.2],
        [0.05, 0.0],
        [-0.15, 0.1],
        [5.0, 5.1],
        [5.2, 4.9],
        [4.9, 5.0],
        [5.1, 5.2],
        [5.0, 4.95],
        [4.85, 5.05],
    ]
}

#[test]
fn test_create_model_per_task() {
    let regression = create_model(5, Task::Regression, &small_mlp()).unwrap();
    assert_eq!(regression.layer_count(), 2);
    assert_eq!(regression.input_dim(), Some(5));
    assert_eq!(regression.output_dim(), Some(1));
    assert_eq!(regression.loss_name(), Some("mean_squared_error"));
    assert_eq!(regression.metrics(), &[Metric::MeanSquaredError]);
    assert!(regression.is_compiled());
    assert_eq!(regression.param_count(), 5 * 8 + 8 + 8 + 1);

    let classifier = create_model(4, Task::Classification, &MlpConfig::default()).unwrap();
    assert_eq!(classifier.output_dim(), Some(3));
    assert_eq!(classifier.metrics(), &[Metric::CategoricalAccuracy]);
    assert!(classifier.regularization_loss() > 0.0);
}

#[test]
fn test_create_model_is_seeded() {
    let a = create_model(3, Task::Regression, &small_mlp()).unwrap();
    let b = create_model(3, Task::Regression, &small_mlp()).unwrap();
    assert_eq!(a.snapshot_weights(), b.snapshot_weights());

    let other_seed = MlpConfig {
        seed: 99,
        ..small_mlp()
    };
    let c = create_model(3, Task::Regression, &other_seed).unwrap();
    assert_ne!(a.snapshot_weights(), c.snapshot_weights());
}

#[test]
fn test_create_model_rejects_bad_input() {
    assert!(matches!(
        create_model(0, Task::Regression, &small_mlp()),
        Err(ModelError::InputValidationError(_))
    ));
    let bad = MlpConfig {
        learning_rate: 0.0,
        ..small_mlp()
    };
    assert!(create_model(2, Task::Regression, &bad).is_err());
}

#[test]
fn test_task_names_and_checkpoint_paths() {
    let config = FitConfig::default();
    assert_eq!(Task::Regression.to_string(), "regression");
    assert_eq!(
        checkpoint_path(Task::Regression, &config),
        PathBuf::from("checkpoints/mlp_model_regression.json")
    );
    assert_eq!(
        checkpoint_path(Task::Classification, &config),
        PathBuf::from("checkpoints/mlp_model_class.json")
    );
}

#[test]
fn test_train_mlp_writes_best_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = FitConfig {
        epochs: 40,
        batch_size: 8,
        patience: 3,
        checkpoint_dir: dir.path().join("ckpt"),
        ..FitConfig::default()
    };
    let (train, valid) = regression_split();
    let mut model = create_model(2, Task::Regression, &small_mlp()).unwrap();

    let history = train_mlp(
        &mut model,
        &train,
        &valid,
        None,
        None,
        Task::Regression,
        &config,
    )
    .unwrap();

    assert!(history.epochs_run >= 1 && history.epochs_run <= 40);
    assert_eq!(history.val_loss.len(), history.epochs_run);
    assert!(history.val_loss.iter().all(|v| v.is_finite()));

    let path = checkpoint_path(Task::Regression, &config);
    assert!(path.exists());

    // the checkpoint holds the best epoch, which is also what early stopping restored
    let saved = Sequential::load_model(&path).unwrap();
    assert_eq!(saved.input_dim(), Some(2));
    assert_eq!(saved.output_dim(), Some(1));
    assert_eq!(saved.snapshot_weights(), model.snapshot_weights());
}

#[test]
fn test_train_mlp_with_fixed_steps() {
    let dir = tempfile::tempdir().unwrap();
    let config = FitConfig {
        epochs: 3,
        batch_size: 16,
        early_stopping: false,
        checkpoint_dir: dir.path().to_path_buf(),
        shuffle_seed: Some(5),
        ..FitConfig::default()
    };
    let (train, valid) = regression_split();
    let mut model = create_model(2, Task::Regression, &small_mlp()).unwrap();

    let history = train_mlp(
        &mut model,
        &train,
        &valid,
        Some(5),
        Some(1),
        Task::Regression,
        &config,
    )
    .unwrap();

    assert_eq!(history.epochs_run, 3);
    assert!(!history.stopped_early());
    let mse_curve = history.curve(&Monitor::Metric(Metric::MeanSquaredError)).unwrap();
    assert_eq!(mse_curve.len(), 3);
}

#[test]
fn test_train_mlp_rejects_invalid_config() {
    let (train, valid) = regression_split();
    let mut model = create_model(2, Task::Regression, &small_mlp()).unwrap();
    let config = FitConfig {
        batch_size: 0,
        ..FitConfig::default()
    };
    assert!(matches!(
        train_mlp(&mut model, &train, &valid, None, None, Task::Regression, &config),
        Err(TrainingError::Model(ModelError::InputValidationError(_)))
    ));
}

fn sweep(types: Vec<CovarianceType>, counts: Vec<usize>) -> GmmSweepConfig {
    GmmSweepConfig {
        covariance_types: types,
        n_components: counts,
        n_init: 3,
        ..GmmSweepConfig::default()
    }
}

#[test]
fn test_train_gmm_scores_every_candidate_in_order() {
    let x = two_blobs();
    let config = sweep(CovarianceType::ALL.to_vec(), vec![1, 2, 3]);
    let selection = train_gmm(&x, &config).unwrap();

    assert_eq!(selection.bic_scores.len(), config.n_candidates());
    assert_eq!(selection.bic_scores.len(), 12);
    assert_eq!(selection.bic_scores[0].covariance_type, CovarianceType::Spherical);
    assert_eq!(selection.bic_scores[0].n_components, 1);
    assert_eq!(selection.bic_scores[4].covariance_type, CovarianceType::Tied);
    assert_eq!(selection.bic_scores[4].n_components, 2);
    assert_eq!(selection.bic_scores[11].covariance_type, CovarianceType::Full);

    let diag: Vec<usize> = selection
        .scores_for(CovarianceType::Diag)
        .iter()
        .map(|s| s.n_components)
        .collect();
    assert_eq!(diag, vec![1, 2, 3]);
}

#[test]
fn test_train_gmm_keeps_first_lowest_bic() {
    let x = two_blobs();
    let selection = train_gmm(&x, &sweep(CovarianceType::ALL.to_vec(), vec![1, 2])).unwrap();

    let lowest = selection
        .bic_scores
        .iter()
        .map(|s| s.bic)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(selection.lowest_bic, lowest);

    let first = selection
        .bic_scores
        .iter()
        .find(|s| s.bic == lowest)
        .unwrap();
    assert_eq!(selection.best_covariance_type(), first.covariance_type);
    assert_eq!(selection.best_n_components(), first.n_components);
    assert_eq!(selection.best_n_components(), 2);
    assert_eq!(selection.best.bic(&x).unwrap(), selection.lowest_bic);
}

#[test]
fn test_train_gmm_is_reproducible() {
    let x = two_blobs();
    let config = sweep(vec![CovarianceType::Diag, CovarianceType::Full], vec![1, 2]);
    let a = train_gmm(&x, &config).unwrap();
    let b = train_gmm(&x, &config).unwrap();
    assert_eq!(a.bic_scores, b.bic_scores);
    assert_eq!(a.best.get_means(), b.best.get_means());
}

#[test]
fn test_train_gmm_rejects_bad_sweeps() {
    let x = two_blobs();
    assert!(matches!(
        train_gmm(&x, &sweep(vec![], vec![1])),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(train_gmm(&x, &sweep(vec![CovarianceType::Full], vec![])).is_err());
    assert!(train_gmm(&x, &sweep(vec![CovarianceType::Full], vec![0])).is_err());
    // more components than samples
    assert!(matches!(
        train_gmm(&x, &sweep(vec![CovarianceType::Diag], vec![20])),
        Err(ModelError::InputValidationError(_))
    ));
}
