//! # Network Module
//!
//! Forward passes of the actor and critic networks.
//!
//! - [`NeuralNetwork`] - plain multi-layer perceptron, the building block of every head
//! - [`recurrent`] - encoders turning observations and their history into a latent vector
//! - [`heads`] - policy and value heads mapping a latent vector to actions or values
//! - [`actor_critic`] - complete actors and critics composed of an encoder and a head
//!
//! Parameters are owned by the networks and serializable with serde; training is left to
//! the caller.

pub mod actor_critic;
pub mod heads;
pub mod recurrent;

pub use actor_critic::{
    Policy, RecurrentActor, RecurrentCritic, RecurrentDoubleCritic, RecurrentGaussianActor,
    RecurrentQNetwork,
};
pub use heads::{
    BootstrapHeads, DeterministicHead, DiscreteHead, GaussianHead, GaussianSample,
    QuantileCritics, ValueHead,
};
pub use recurrent::{HistoryEncoder, InnerEncoder, SpatialTemporalEncoder, TrackInput};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{ColavError, Result};
use crate::layers::{DenseLayer, Layer};

/// A feed-forward network made of dense layers applied in sequence
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
}

impl NeuralNetwork {
    /// Create a network from its layer sizes and one activation per layer.
    ///
    /// `layer_sizes` includes the input size, so it has one more entry than `activations`.
    pub fn new<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        activations: &[Activation],
        rng: &mut R,
    ) -> Result<Self> {
        if layer_sizes.len() < 2 || layer_sizes.len() - 1 != activations.len() {
            return Err(ColavError::invalid_parameter(
                "layer_sizes",
                format!(
                    "{} sizes need {} activations, got {}",
                    layer_sizes.len(),
                    layer_sizes.len().saturating_sub(1),
                    activations.len()
                ),
            ));
        }

        let layers = layer_sizes
            .windows(2)
            .zip(activations.iter())
            .map(|(window, &activation)| DenseLayer::new(window[0], window[1], activation, rng))
            .collect();

        Ok(NeuralNetwork { layers })
    }

    /// ReLU hidden layers followed by an output layer with `output_activation`
    pub fn mlp<R: Rng + ?Sized>(
        input_size: usize,
        hidden_sizes: &[usize],
        output_size: usize,
        output_activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let mut sizes = Vec::with_capacity(hidden_sizes.len() + 2);
        sizes.push(input_size);
        sizes.extend_from_slice(hidden_sizes);
        sizes.push(output_size);

        let activations: Vec<Activation> = vec![Activation::Relu; hidden_sizes.len()]
            .into_iter()
            .chain(std::iter::once(output_activation))
            .collect();

        Self::new(&sizes, &activations, rng)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.output_size()).unwrap_or(0)
    }

    /// Forward pass for a single input vector
    pub fn forward(&self, input: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_input(input.len())?;
        let mut output = input.to_owned();
        for layer in &self.layers {
            output = layer.forward(output.view());
        }
        Ok(output)
    }

    /// Forward pass for a batch of input vectors, one per row
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_input(inputs.ncols())?;
        let mut output = inputs.to_owned();
        for layer in &self.layers {
            output = layer.forward_batch(output.view());
        }
        Ok(output)
    }

    fn check_input(&self, len: usize) -> Result<()> {
        if len != self.input_size() {
            return Err(ColavError::dimension_mismatch(
                format!("{} inputs", self.input_size()),
                format!("{} inputs", len),
            ));
        }
        Ok(())
    }
}

/// Concatenate two vectors
pub(crate) fn concat(a: ArrayView1<f32>, b: ArrayView1<f32>) -> Array1<f32> {
    a.iter().chain(b.iter()).copied().collect()
}
