use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,

    /// Uniform distribution with custom range
    Uniform { min: f32, max: f32 },

    /// All zeros
    Zeros,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix from `rng`
    pub fn initialize_weights<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Array2<f32> {
        let (fan_in, fan_out) = shape;

        match *self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }
            WeightInit::HeUniform => {
                let limit = (6.0 / fan_in.max(1) as f32).sqrt();
                Array2::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }
            WeightInit::Uniform { min, max } => {
                Array2::random_using(shape, Uniform::new_inclusive(min, max), rng)
            }
            WeightInit::Zeros => Array2::zeros(shape),
        }
    }

    /// Biases start at zero except for the custom uniform range
    pub fn initialize_biases<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Array1<f32> {
        match *self {
            WeightInit::Uniform { min, max } => {
                Array1::random_using(size, Uniform::new_inclusive(min, max), rng)
            }
            _ => Array1::zeros(size),
        }
    }

    /// Recommended initialization for an activation function
    pub fn for_activation(activation: Activation) -> Self {
        match activation {
            Activation::Relu => WeightInit::HeUniform,
            Activation::Sigmoid | Activation::Tanh | Activation::Linear => {
                WeightInit::XavierUniform
            }
        }
    }
}
