use ndarray::{array, Array2};
use crate::activations::{softplus, Activation};

#[test]
fn test_relu_activation() {
    let relu = Activation::Relu;
    let mut input = array![-1.0, 0.0, 1.0, 2.0];
    relu.apply(&mut input);
    assert_eq!(input, array![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_sigmoid_activation() {
    let sigmoid = Activation::Sigmoid;
    let mut input = array![0.0];
    sigmoid.apply(&mut input);
    assert!((input[0] - 0.5).abs() < 1e-6);
}

#[test]
fn test_tanh_bounds_actions() {
    let mut input = array![-50.0, 0.0, 50.0];
    Activation::Tanh.apply(&mut input);
    assert_eq!(input[1], 0.0);
    assert!(input.iter().all(|v| (-1.0..=1.0).contains(v)));
}

#[test]
fn test_linear_is_identity() {
    let mut input = Array2::from_elem((2, 3), -0.75f32);
    let expected = input.clone();
    Activation::Linear.apply(&mut input);
    assert_eq!(input, expected);
}

#[test]
fn test_scalar_matches_array() {
    for activation in [
        Activation::Relu,
        Activation::Linear,
        Activation::Sigmoid,
        Activation::Tanh,
    ] {
        let mut input = array![-0.3f32];
        activation.apply(&mut input);
        assert_eq!(input[0], activation.scalar(-0.3));
    }
}

#[test]
fn test_softplus() {
    assert!((softplus(0.0) - 2.0f32.ln()).abs() < 1e-6);
    assert_eq!(softplus(100.0), 100.0);
    assert!(softplus(-100.0) >= 0.0);
}
