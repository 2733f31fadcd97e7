#![cfg(feature = "neural_network")]

use modelsmith::error::{ModelError, TrainingError};
use modelsmith::metric::Metric;
use modelsmith::neural_network::*;
use ndarray::Array2;

fn tiny_model() -> Sequential {
    let mut model = Sequential::new();
    model
        .add(
            Dense::new(2, 3, Activation::ReLU)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(1)),
        )
        .add(
            Dense::new(3, 1, Activation::Linear)
                .with_kernel_initializer(Initializer::glorot_uniform_seeded(2)),
        )
        .compile(
            SGD::new(0.01).unwrap(),
            MeanSquaredError::new(),
            vec![Metric::MeanSquaredError],
        );
    model
}

fn logs(epoch: usize, val_loss: f32) -> EpochLogs {
    EpochLogs {
        epoch,
        loss: 1.0,
        val_loss: Some(val_loss),
        metrics: vec![(Metric::MeanSquaredError, 1.0)],
        val_metrics: vec![(Metric::MeanSquaredError, val_loss)],
    }
}

/// Rewrites the first kernel so a snapshot can be told apart.
fn mark_weights(model: &mut Sequential, value: f32) {
    let mut weights = model.snapshot_weights();
    let SerializableLayerWeight::Dense(dense) = &mut weights[0];
    dense.weight[0][0] = value;
    model.restore_weights(&weights).unwrap();
}

fn first_weight(model: &Sequential) -> f32 {
    let SerializableLayerWeight::Dense(dense) = &model.snapshot_weights()[0];
    dense.weight[0][0]
}

#[test]
fn test_early_stopping_waits_for_patience() {
    let mut model = tiny_model();
    let mut es = EarlyStopping::new(Monitor::ValLoss, 3);
    es.on_train_begin(&model).unwrap();

    let val_losses = [1.0, 0.5, 0.6, 0.7, 0.8, 0.9];
    let mut actions = Vec::new();
    for (epoch, &v) in val_losses.iter().enumerate() {
        actions.push(es.on_epoch_end(&logs(epoch, v), &mut model).unwrap());
    }

    // best at epoch 1, three non-improving epochs 2, 3, 4
    assert_eq!(actions[3], CallbackAction::Continue);
    assert_eq!(actions[4], CallbackAction::StopTraining);
    assert_eq!(es.best_epoch(), Some(1));
    assert_eq!(es.best(), 0.5);
    assert_eq!(es.stopped_epoch(), Some(4));
}

#[test]
fn test_early_stopping_min_delta() {
    let mut model = tiny_model();
    let mut es = EarlyStopping::new(Monitor::ValLoss, 2).with_min_delta(0.1);
    es.on_train_begin(&model).unwrap();

    es.on_epoch_end(&logs(0, 1.0), &mut model).unwrap();
    // improvements smaller than min_delta do not reset the wait
    es.on_epoch_end(&logs(1, 0.95), &mut model).unwrap();
    let action = es.on_epoch_end(&logs(2, 0.92), &mut model).unwrap();
    assert_eq!(action, CallbackAction::StopTraining);
    assert_eq!(es.best_epoch(), Some(0));
}

#[test]
fn test_early_stopping_on_accuracy_prefers_higher() {
    let mut model = tiny_model();
    let monitor = Monitor::ValMetric(Metric::CategoricalAccuracy);
    let mut es = EarlyStopping::new(monitor, 1);
    es.on_train_begin(&model).unwrap();

    let epoch_logs = |epoch, acc| EpochLogs {
        epoch,
        loss: 1.0,
        val_loss: Some(1.0),
        metrics: vec![],
        val_metrics: vec![(Metric::CategoricalAccuracy, acc)],
    };

    es.on_epoch_end(&epoch_logs(0, 0.5), &mut model).unwrap();
    es.on_epoch_end(&epoch_logs(1, 0.8), &mut model).unwrap();
    assert_eq!(es.best_epoch(), Some(1));
    let action = es.on_epoch_end(&epoch_logs(2, 0.7), &mut model).unwrap();
    assert_eq!(action, CallbackAction::StopTraining);
}

#[test]
fn test_early_stopping_restores_best_weights() {
    let mut model = tiny_model();
    let mut es = EarlyStopping::new(Monitor::ValLoss, 2).restore_best_weights(true);
    es.on_train_begin(&model).unwrap();

    mark_weights(&mut model, 0.25);
    es.on_epoch_end(&logs(0, 1.0), &mut model).unwrap();
    mark_weights(&mut model, 0.5);
    es.on_epoch_end(&logs(1, 0.4), &mut model).unwrap();
    mark_weights(&mut model, 0.75);
    es.on_epoch_end(&logs(2, 0.6), &mut model).unwrap();
    mark_weights(&mut model, 1.0);
    es.on_epoch_end(&logs(3, 0.7), &mut model).unwrap();

    es.on_train_end(&mut model).unwrap();
    assert_eq!(first_weight(&model), 0.5);
}

#[test]
fn test_early_stopping_without_restore_keeps_last_weights() {
    let mut model = tiny_model();
    let mut es = EarlyStopping::new(Monitor::ValLoss, 1);
    es.on_train_begin(&model).unwrap();

    mark_weights(&mut model, 0.5);
    es.on_epoch_end(&logs(0, 0.4), &mut model).unwrap();
    mark_weights(&mut model, 0.75);
    es.on_epoch_end(&logs(1, 0.6), &mut model).unwrap();

    es.on_train_end(&mut model).unwrap();
    assert_eq!(first_weight(&model), 0.75);
}

#[test]
fn test_checkpoint_saves_only_on_improvement() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("best.json");

    let mut model = tiny_model();
    let mut checkpoint = ModelCheckpoint::new(&path);
    checkpoint.on_train_begin(&model).unwrap();

    for (epoch, v) in [1.0, 0.8, 0.9, 0.8, 0.3].into_iter().enumerate() {
        checkpoint.on_epoch_end(&logs(epoch, v), &mut model).unwrap();
    }

    // 1.0, 0.8 and 0.3 improve; a tie does not
    assert_eq!(checkpoint.saves(), 3);
    assert_eq!(checkpoint.best(), 0.3);
    assert!(path.exists());

    let loaded = Sequential::load_model(&path).unwrap();
    assert_eq!(loaded.snapshot_weights(), model.snapshot_weights());
}

#[test]
fn test_checkpoint_keeps_best_model_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.json");

    let mut model = tiny_model();
    let mut checkpoint = ModelCheckpoint::new(&path);
    checkpoint.on_train_begin(&model).unwrap();

    mark_weights(&mut model, 0.5);
    checkpoint.on_epoch_end(&logs(0, 0.4), &mut model).unwrap();
    mark_weights(&mut model, 0.75);
    checkpoint.on_epoch_end(&logs(1, 0.6), &mut model).unwrap();

    let loaded = Sequential::load_model(&path).unwrap();
    assert_eq!(first_weight(&loaded), 0.5);
}

#[test]
fn test_checkpoint_every_epoch_weights_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");

    let mut model = tiny_model();
    let mut checkpoint = ModelCheckpoint::new(&path)
        .save_best_only(false)
        .save_weights_only(true);
    assert_eq!(checkpoint.monitor(), None);

    for (epoch, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        checkpoint.on_epoch_end(&logs(epoch, v), &mut model).unwrap();
    }
    assert_eq!(checkpoint.saves(), 3);

    // a weights file is not a full model file
    assert!(Sequential::load_model(&path).is_err());
    let mut rebuilt = tiny_model();
    mark_weights(&mut rebuilt, 42.0);
    rebuilt.load_from_path(&path).unwrap();
    assert_eq!(rebuilt.snapshot_weights(), model.snapshot_weights());
}

#[test]
fn test_fit_stops_early_and_restores() {
    let x = Array2::from_shape_fn((16, 2), |(i, j)| (i + j) as f32 / 16.0);
    let y = Array2::from_shape_fn((16, 1), |(i, _)| i as f32 / 8.0);
    let train = Dataset::new(x.clone(), y.clone()).unwrap();
    let valid = Dataset::new(x, y).unwrap();

    // a huge min_delta lets only the first epoch count as an improvement
    let mut model = tiny_model();
    let history = model
        .fit_dataset(
            &train,
            FitOptions::new(500)
                .with_batch_size(16)
                .with_validation(&valid, None)
                .with_callback(
                    EarlyStopping::new(Monitor::ValLoss, 5)
                        .with_min_delta(1e3)
                        .restore_best_weights(true),
                ),
        )
        .unwrap();

    assert!(history.stopped_early());
    assert_eq!(history.stopped_epoch, Some(5));
    assert_eq!(history.epochs_run, 6);
    assert_eq!(history.val_loss.len(), 6);

    // the weights of epoch 0 are back in place
    let evaluation = model.evaluate(&valid, 16).unwrap();
    assert!((evaluation.loss - history.val_loss[0]).abs() < 1e-6);
}

fn diverging_model() -> Sequential {
    let mut model = Sequential::new();
    model
        .add(Dense::new(1, 1, Activation::Linear).with_kernel_initializer(Initializer::Zeros))
        .compile(SGD::new(0.5).unwrap(), MeanSquaredError::new(), vec![]);
    model
}

#[test]
fn test_divergence_still_restores_best_weights() {
    // step size far beyond 1 / mean(x²), so every SGD step overshoots further
    let x = Array2::from_shape_fn((8, 1), |(i, _)| (i + 1) as f32);
    let data = Dataset::new(x.clone(), x).unwrap();

    let mut reference = diverging_model();
    reference
        .fit_dataset(&data, FitOptions::new(1).with_batch_size(8))
        .unwrap();

    let mut model = diverging_model();
    let result = model.fit_dataset(
        &data,
        FitOptions::new(500)
            .with_batch_size(8)
            .with_validation(&data, None)
            .with_callback(EarlyStopping::new(Monitor::ValLoss, 500).restore_best_weights(true)),
    );

    assert!(matches!(
        result,
        Err(TrainingError::Model(ModelError::ProcessingError(_)))
    ));
    // every later epoch is worse, so the weights after the first epoch come back
    assert_eq!(model.snapshot_weights(), reference.snapshot_weights());
    assert!(first_weight(&model).is_finite());
}
