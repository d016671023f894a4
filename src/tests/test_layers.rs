use ndarray::{arr1, arr2, s, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::layers::{
    DenseLayer, GruLayer, Layer, LstmLayer, RecurrentKind, RecurrentLayer, SequenceModel,
    WeightInit,
};

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn sequence(batch: usize, steps: usize, width: usize) -> Array3<f32> {
    Array3::from_shape_fn((batch, steps, width), |(b, t, i)| {
        ((b * 7 + t * 3 + i) as f32 * 0.37).sin()
    })
}

#[test]
fn test_dense_layer_forward() {
    let layer = DenseLayer::new(2, 2, Activation::Linear, &mut rng())
        .with_weights(arr2(&[[1.0, 0.0], [0.0, 1.0]]))
        .unwrap()
        .with_biases(arr1(&[1.0, -1.0]))
        .unwrap();

    let output = layer.forward(arr1(&[2.0, 3.0]).view());
    assert_eq!(output, arr1(&[3.0, 2.0]));
}

#[test]
fn test_dense_layer_rejects_wrong_weight_shape() {
    let layer = DenseLayer::new(3, 2, Activation::Relu, &mut rng());
    assert!(layer.with_weights(arr2(&[[1.0, 0.0]])).is_err());
}

#[test]
fn test_dense_batch_matches_single() {
    let layer = DenseLayer::new(3, 4, Activation::Relu, &mut rng());
    let inputs = arr2(&[[0.1, -0.2, 0.3], [1.0, 0.5, -0.5]]);

    let batch = layer.forward_batch(inputs.view());
    for (row, input) in batch.rows().into_iter().zip(inputs.rows()) {
        let single = layer.forward(input);
        for (a, b) in row.iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}

#[test]
fn test_weight_init_for_activation() {
    assert_eq!(WeightInit::for_activation(Activation::Relu), WeightInit::HeUniform);
    assert_eq!(WeightInit::for_activation(Activation::Tanh), WeightInit::XavierUniform);

    let weights =
        WeightInit::Uniform { min: -0.1, max: 0.1 }.initialize_weights((5, 5), &mut rng());
    assert!(weights.iter().all(|w| (-0.1..=0.1).contains(w)));
    assert!(WeightInit::Zeros.initialize_weights((2, 3), &mut rng()).iter().all(|&w| w == 0.0));
}

#[test]
fn test_same_seed_same_parameters() {
    let a = GruLayer::new(3, 5, &mut rng());
    let b = GruLayer::new(3, 5, &mut rng());
    assert_eq!(a, b);
}

#[test]
fn test_gru_output_shape() {
    let gru = GruLayer::new(4, 6, &mut rng());
    let output = gru.forward_sequence(sequence(2, 3, 4).view());
    assert_eq!(output.dim(), (2, 3, 6));
}

#[test]
fn test_gru_is_causal() {
    let gru = GruLayer::new(3, 5, &mut rng());
    let input = sequence(1, 4, 3);
    let mut changed = input.clone();
    changed.slice_mut(s![0, 3, ..]).fill(9.0);

    let a = gru.forward_sequence(input.view());
    let b = gru.forward_sequence(changed.view());

    assert_eq!(a.slice(s![.., ..3, ..]), b.slice(s![.., ..3, ..]));
    assert_ne!(a.slice(s![.., 3, ..]), b.slice(s![.., 3, ..]));
}

#[test]
fn test_lstm_is_causal() {
    let lstm = LstmLayer::new(3, 5, &mut rng());
    let input = sequence(1, 4, 3);
    let mut changed = input.clone();
    changed.slice_mut(s![0, 2.., ..]).fill(-4.0);

    let a = lstm.forward_sequence(input.view());
    let b = lstm.forward_sequence(changed.view());

    assert_eq!(a.slice(s![.., ..2, ..]), b.slice(s![.., ..2, ..]));
}

#[test]
fn test_sequence_batch_elements_are_independent() {
    for kind in [RecurrentKind::Gru, RecurrentKind::Lstm] {
        let layer = RecurrentLayer::new(kind, 4, 3, &mut rng());
        let batch = sequence(3, 5, 4);
        let outputs = layer.forward_sequence(batch.view());

        for b in 0..3 {
            let single = batch.slice(s![b..b + 1, .., ..]);
            let alone = layer.forward_sequence(single);
            for (x, y) in alone.iter().zip(outputs.slice(s![b, .., ..]).iter()) {
                assert!((x - y).abs() < 1e-5);
            }
        }
        assert_eq!(layer.kind(), kind);
    }
}

#[test]
fn test_recurrent_hidden_states_are_bounded() {
    let layer = RecurrentLayer::new(RecurrentKind::Lstm, 2, 4, &mut rng());
    let input = Array3::from_elem((1, 6, 2), 1e3f32);
    let output = layer.forward_sequence(input.view());
    assert!(output.iter().all(|h| h.abs() <= 1.0));
}
