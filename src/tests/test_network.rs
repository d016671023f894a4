use ndarray::{arr1, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::config::EncoderConfig;
use crate::error::ColavError;
use crate::layers::{Layer, RecurrentKind};
use crate::network::{InnerEncoder, NeuralNetwork, SpatialTemporalEncoder, TrackInput};
use crate::observation::{Observation, ObservationLayout};

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn small_config() -> EncoderConfig {
    EncoderConfig {
        own_features: 2,
        block_width: 3,
        capacity: 3,
        inner_hidden: 8,
        outer_hidden: 6,
        head_hidden: 8,
        history_length: 2,
        recurrent: RecurrentKind::Gru,
        use_past_actions: false,
    }
}

fn observation(layout: ObservationLayout, seed: f32, cardinality: usize) -> Observation {
    let own = Array1::from_shape_fn(layout.own_features, |i| (seed + i as f32).sin());
    let blocks = (0..cardinality)
        .map(|b| {
            Array1::from_shape_fn(layout.block_width, |i| (seed * 0.5 + (b * 3 + i) as f32).cos())
        })
        .collect();
    Observation::new(layout, own, blocks).unwrap()
}

#[test]
fn test_neural_network_creation() {
    let activations = [Activation::Relu, Activation::Linear];
    let network = NeuralNetwork::new(&[3, 4, 2], &activations, &mut rng()).unwrap();

    assert_eq!(network.layers.len(), 2);
    assert_eq!(network.layers[0].weights.shape(), [3, 4]);
    assert_eq!(network.layers[1].biases.shape(), [2]);
    assert_eq!(network.input_size(), 3);
    assert_eq!(network.output_size(), 2);
}

#[test]
fn test_neural_network_rejects_inconsistent_activations() {
    let result = NeuralNetwork::new(&[3, 4, 2], &[Activation::Relu], &mut rng());
    assert!(matches!(result, Err(ColavError::InvalidParameter { .. })));
}

#[test]
fn test_forward_checks_input_size() {
    let network = NeuralNetwork::mlp(3, &[5], 2, Activation::Tanh, &mut rng()).unwrap();
    assert_eq!(network.forward(arr1(&[1.0, 2.0, 3.0]).view()).unwrap().len(), 2);
    assert!(matches!(
        network.forward(arr1(&[1.0, 2.0]).view()),
        Err(ColavError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_mlp_hidden_layers_use_relu() {
    let network = NeuralNetwork::mlp(2, &[4, 4], 1, Activation::Linear, &mut rng()).unwrap();
    let activations: Vec<Activation> = network.layers.iter().map(|l| l.activation).collect();
    assert_eq!(activations, vec![Activation::Relu, Activation::Relu, Activation::Linear]);
    assert_eq!(network.layers[1].output_size(), 4);
}

#[test]
fn test_inner_encoder_rejects_empty_observation() {
    let layout = ObservationLayout::new(2, 3, 3).unwrap();
    let encoder = InnerEncoder::new(layout, 8, RecurrentKind::Lstm, &mut rng());
    let empty = Observation::new(layout, arr1(&[0.1, 0.2]), Vec::new()).unwrap();

    assert!(matches!(encoder.forward(&empty), Err(ColavError::InvariantViolation(_))));
}

#[test]
fn test_inner_encoder_padded_matches_tagged() {
    let layout = ObservationLayout::new(2, 3, 3).unwrap();
    let encoder = InnerEncoder::new(layout, 8, RecurrentKind::Gru, &mut rng());
    let obs = observation(layout, 0.4, 2);

    let tagged = encoder.forward(&obs).unwrap();
    let padded = encoder.forward_padded(obs.to_padded().view()).unwrap();

    assert_eq!(tagged.len(), encoder.latent_size());
    assert_eq!(tagged, padded);
}

#[test]
fn test_inner_encoder_rejects_foreign_layout() {
    let layout = ObservationLayout::new(2, 3, 3).unwrap();
    let encoder = InnerEncoder::new(layout, 8, RecurrentKind::Gru, &mut rng());
    let other = observation(ObservationLayout::new(2, 3, 4).unwrap(), 0.1, 1);

    assert!(matches!(encoder.forward(&other), Err(ColavError::DimensionMismatch { .. })));
}

#[test]
fn test_past_actions_rejected_at_construction() {
    let config = EncoderConfig {
        use_past_actions: true,
        ..small_config()
    };
    assert!(matches!(
        SpatialTemporalEncoder::new(&config, &mut rng()),
        Err(ColavError::NotImplemented(_))
    ));
}

#[test]
fn test_encode_latent_width() {
    let encoder = SpatialTemporalEncoder::new(&small_config(), &mut rng()).unwrap();
    let layout = encoder.layout();
    let current = observation(layout, 1.0, 3);
    let past = [observation(layout, 0.5, 1)];

    let latent = encoder.encode(&current, past.iter()).unwrap();
    assert_eq!(latent.len(), 6);
    assert!(latent.iter().all(|v| v.is_finite()));
}

#[test]
fn test_encode_rejects_long_history() {
    let encoder = SpatialTemporalEncoder::new(&small_config(), &mut rng()).unwrap();
    let layout = encoder.layout();
    let current = observation(layout, 1.0, 1);
    let past: Vec<Observation> = (0..3).map(|k| observation(layout, k as f32, 1)).collect();

    assert!(matches!(
        encoder.encode(&current, past.iter()),
        Err(ColavError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_history_changes_latent() {
    let encoder = SpatialTemporalEncoder::new(&small_config(), &mut rng()).unwrap();
    let layout = encoder.layout();
    let current = observation(layout, 1.0, 2);
    let past = [observation(layout, -2.0, 3)];

    let without = encoder.encode(&current, std::iter::empty()).unwrap();
    let with = encoder.encode(&current, past.iter()).unwrap();
    assert_ne!(without, with);
}

#[test]
fn test_batch_matches_per_track_encoding() {
    for kind in [RecurrentKind::Gru, RecurrentKind::Lstm] {
        let config = EncoderConfig {
            recurrent: kind,
            ..small_config()
        };
        let encoder = SpatialTemporalEncoder::new(&config, &mut rng()).unwrap();
        let layout = encoder.layout();

        let currents: Vec<Observation> =
            (0..3).map(|k| observation(layout, k as f32, k + 1)).collect();
        let pasts: Vec<Observation> =
            (0..2).map(|k| observation(layout, 10.0 + k as f32, 2)).collect();

        // valid history lengths 0, 1 and 2 in one batch
        let tracks: Vec<TrackInput> = currents
            .iter()
            .enumerate()
            .map(|(h, current)| TrackInput::new(current, pasts[..h].iter()))
            .collect();

        let batch = encoder.encode_batch(&tracks).unwrap();
        for (b, track) in tracks.iter().enumerate() {
            let single = encoder.encode(track.current, track.history.iter().copied()).unwrap();
            for (x, y) in batch.row(b).iter().zip(single.iter()) {
                assert!((x - y).abs() < 1e-5);
            }
        }
    }
}
