#![cfg(feature = "training")]

use modelsmith::config::{FitConfig, GmmSweepConfig, MlpConfig, TrainingConfig};
use modelsmith::error::{IoError, ModelError};
use modelsmith::machine_learning::CovarianceType;
use modelsmith::neural_network::Activation;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = TrainingConfig::default();

    assert_eq!(config.mlp.hidden_units, 128);
    assert_eq!(config.mlp.output_units, 3);
    assert_eq!(config.mlp.hidden_activation, Activation::ReLU);
    assert_eq!(config.mlp.learning_rate, 0.01);
    assert_eq!(config.mlp.l2, 1e-4);

    assert_eq!(config.fit.epochs, 1000);
    assert_eq!(config.fit.batch_size, 32);
    assert!(config.fit.early_stopping);
    assert_eq!(config.fit.patience, 20);
    assert!(config.fit.restore_best_weights);
    assert_eq!(config.fit.checkpoint_dir, PathBuf::from("checkpoints"));
    assert_eq!(config.fit.regression_checkpoint, "mlp_model_regression");
    assert_eq!(config.fit.classification_checkpoint, "mlp_model_class");
    assert!(config.fit.save_best_only);
    assert!(!config.fit.save_weights_only);
    assert_eq!(config.fit.shuffle_seed, None);

    assert_eq!(config.gmm.covariance_types, CovarianceType::ALL.to_vec());
    assert_eq!(config.gmm.n_components, (1..=11).collect::<Vec<_>>());
    assert_eq!(config.gmm.n_init, 100);
    assert_eq!(config.gmm.random_state, Some(2));
    assert_eq!(config.gmm.n_candidates(), 44);

    config.validate().unwrap();
}

#[test]
fn test_partial_json_falls_back_to_defaults() {
    let empty: TrainingConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, TrainingConfig::default());

    let partial: TrainingConfig = serde_json::from_str(
        r#"{
            "mlp": { "hidden_units": 16, "hidden_activation": "Sigmoid" },
            "gmm": { "covariance_types": ["diag", "full"], "n_components": [2, 4] }
        }"#,
    )
    .unwrap();
    assert_eq!(partial.mlp.hidden_units, 16);
    assert_eq!(partial.mlp.hidden_activation, Activation::Sigmoid);
    assert_eq!(partial.mlp.output_units, 3);
    assert_eq!(
        partial.gmm.covariance_types,
        vec![CovarianceType::Diag, CovarianceType::Full]
    );
    assert_eq!(partial.gmm.n_candidates(), 4);
    assert_eq!(partial.fit, FitConfig::default());
}

#[test]
fn test_json_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let path = path.to_str().unwrap();

    let config = TrainingConfig {
        mlp: MlpConfig {
            seed: 7,
            ..MlpConfig::default()
        },
        fit: FitConfig {
            epochs: 5,
            shuffle_seed: Some(3),
            ..FitConfig::default()
        },
        gmm: GmmSweepConfig {
            n_components: vec![1, 2, 3],
            random_state: None,
            ..GmmSweepConfig::default()
        },
    };
    config.to_json_file(path).unwrap();

    let loaded = TrainingConfig::from_json_file(path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_from_json_file_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        TrainingConfig::from_json_file(missing.to_str().unwrap()),
        Err(IoError::StdIoError(_))
    ));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(
        TrainingConfig::from_json_file(broken.to_str().unwrap()),
        Err(IoError::JsonError(_))
    ));
}

#[test]
fn test_validate_rejects_out_of_range_values() {
    let invalid = |config: TrainingConfig| {
        matches!(config.validate(), Err(ModelError::InputValidationError(_)))
    };
    let base = TrainingConfig::default;

    let mut c = base();
    c.mlp.hidden_units = 0;
    assert!(invalid(c));

    let mut c = base();
    c.mlp.learning_rate = f32::NAN;
    assert!(invalid(c));

    let mut c = base();
    c.mlp.l2 = -1.0;
    assert!(invalid(c));

    let mut c = base();
    c.fit.epochs = 0;
    assert!(invalid(c));

    let mut c = base();
    c.fit.classification_checkpoint = String::new();
    assert!(invalid(c));

    let mut c = base();
    c.gmm.n_components = vec![];
    assert!(invalid(c));

    let mut c = base();
    c.gmm.n_components = vec![0, 1];
    assert!(invalid(c));

    let mut c = base();
    c.gmm.n_init = 0;
    assert!(invalid(c));

    let mut c = base();
    c.gmm.tol = 0.0;
    assert!(invalid(c));

    let mut c = base();
    c.gmm.reg_covar = f64::INFINITY;
    assert!(invalid(c));
}
