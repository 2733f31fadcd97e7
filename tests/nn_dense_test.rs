#![cfg(feature = "neural_network")]

use approx::assert_abs_diff_eq;
use modelsmith::error::ModelError;
use modelsmith::neural_network::*;
use ndarray::{Array, Array2, array};

#[test]
fn test_forward_shape_and_bias() {
    let mut dense = Dense::new(3, 2, Activation::Linear)
        .with_kernel_initializer(Initializer::Zeros);
    let x = Array::ones((4, 3)).into_dyn();
    let out = dense.forward(&x).unwrap();
    assert_eq!(out.shape(), &[4, 2]);
    // zero kernel and zero bias
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn test_forward_rejects_wrong_width() {
    let mut dense = Dense::new(3, 2, Activation::ReLU);
    let x = Array::ones((4, 5)).into_dyn();
    assert!(matches!(
        dense.forward(&x),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn test_backward_before_forward_fails() {
    let mut dense = Dense::new(3, 2, Activation::ReLU);
    let grad = Array::ones((4, 2)).into_dyn();
    assert!(matches!(
        dense.backward(&grad),
        Err(ModelError::ProcessingError(_))
    ));
}

#[test]
fn test_param_count_and_output_shape() {
    let dense = Dense::new(10, 128, Activation::ReLU);
    assert_eq!(dense.param_count(), 10 * 128 + 128);
    assert_eq!(dense.output_shape(), "(None, 128)");
    assert_eq!(dense.layer_type(), "Dense");
}

#[test]
fn test_seeded_glorot_is_reproducible_and_bounded() {
    let a = Initializer::glorot_uniform_seeded(1234).initialize(6, 4);
    let b = Initializer::glorot_uniform_seeded(1234).initialize(6, 4);
    let c = Initializer::glorot_uniform_seeded(99).initialize(6, 4);
    assert_eq!(a, b);
    assert_ne!(a, c);

    let limit = Initializer::glorot_limit(6, 4);
    assert_abs_diff_eq!(limit, 0.7745967, epsilon = 1e-6);
    assert!(a.iter().all(|w| w.abs() <= limit));
}

#[test]
fn test_l2_regularization_loss() {
    let mut dense = Dense::new(2, 2, Activation::Linear).with_kernel_regularizer(Regularizer::L2(0.5));
    dense
        .set_dense_weights(array![[1.0, 2.0], [0.0, -1.0]], Array2::zeros((1, 2)))
        .unwrap();
    // 0.5 * (1 + 4 + 0 + 1)
    assert_abs_diff_eq!(dense.regularization_loss(), 3.0, epsilon = 1e-6);

    let unregularized = Dense::new(2, 2, Activation::Linear);
    assert_eq!(unregularized.regularization_loss(), 0.0);
}

#[test]
fn test_set_dense_weights_shape_mismatch() {
    let mut dense = Dense::new(3, 2, Activation::Linear);
    assert!(dense
        .set_dense_weights(Array2::zeros((2, 3)), Array2::zeros((1, 2)))
        .is_err());
    assert!(dense
        .set_dense_weights(Array2::zeros((3, 2)), Array2::zeros((1, 3)))
        .is_err());
}

#[test]
fn test_linear_gradient_matches_closed_form() {
    let mut dense = Dense::new(2, 1, Activation::Linear);
    dense
        .set_dense_weights(array![[0.5], [-0.25]], array![[0.1]])
        .unwrap();

    let x = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    dense.forward(&x).unwrap();
    let grad_input = dense.backward(&array![[1.0f32], [1.0]].into_dyn()).unwrap();

    // dL/dx = upstream · Wᵀ
    assert_eq!(grad_input.shape(), &[2, 2]);
    assert_abs_diff_eq!(grad_input[[0, 0]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(grad_input[[0, 1]], -0.25, epsilon = 1e-6);

    // one SGD step with lr 0.1: W -= 0.1 · xᵀ·upstream = [4, 6]
    dense.update_parameters_sgd(0.1);
    let LayerWeight::Dense(w) = dense.get_weights();
    assert_abs_diff_eq!(w.weight[[0, 0]], 0.1, epsilon = 1e-6);
    assert_abs_diff_eq!(w.weight[[1, 0]], -0.85, epsilon = 1e-6);
    assert_abs_diff_eq!(w.bias[[0, 0]], -0.1, epsilon = 1e-6);
}

#[test]
fn test_softmax_rows_sum_to_one() {
    let z = array![[1.0f32, 2.0, 3.0], [1000.0, 1000.0, 1000.0]];
    let a = Activation::Softmax.apply_activation(&z);
    for row in a.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }
    assert_abs_diff_eq!(a[[1, 0]], 1.0 / 3.0, epsilon = 1e-5);
}

#[test]
fn test_config_rebuilds_same_architecture() {
    let dense = Dense::new(4, 3, Activation::Softmax).with_kernel_regularizer(Regularizer::L2(1e-4));
    let config = dense.config();
    let rebuilt = config.build();
    assert_eq!(rebuilt.config(), config);
    assert_eq!(rebuilt.output_shape(), "(None, 3)");
}

#[test]
fn test_adam_first_step_and_very_late_step() {
    let grad = Array2::from_elem((1, 1), 1.0f32);

    // bias correction makes the first step exactly lr in magnitude
    let mut states = AdamStates::new((1, 1), (1, 1));
    let (w_step, b_step) = states.update_parameter(&grad, &grad, 0.9, 0.999, 1e-7, 1, 0.001);
    assert_abs_diff_eq!(w_step[[0, 0]], 0.001, epsilon = 1e-6);
    assert_abs_diff_eq!(b_step[[0, 0]], 0.001, epsilon = 1e-6);

    // with the step count past i32::MAX both corrections are 1
    let mut states = AdamStates::new((1, 1), (1, 1));
    let (w_step, _) = states.update_parameter(&grad, &grad, 0.9, 0.999, 1e-7, u64::MAX, 0.001);
    let expected = 0.001 * 0.1 / (0.001f32.sqrt() + 1e-7);
    assert!(w_step[[0, 0]] > 0.0);
    assert_abs_diff_eq!(w_step[[0, 0]], expected, epsilon = 1e-6);
}
