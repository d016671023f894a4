use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

/// An enumeration of the activation functions available to layers and heads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Apply the activation function in-place, for arrays of any dimension.
    pub fn apply<D: Dimension>(&self, input: &mut Array<f32, D>) {
        match self {
            Activation::Relu => input.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
            Activation::Sigmoid => input.mapv_inplace(sigmoid),
            Activation::Tanh => input.mapv_inplace(f32::tanh),
        }
    }

    /// Apply the activation function to a single value.
    pub fn scalar(&self, v: f32) -> f32 {
        match self {
            Activation::Relu => v.max(0.0),
            Activation::Linear => v,
            Activation::Sigmoid => sigmoid(v),
            Activation::Tanh => v.tanh(),
        }
    }
}

#[inline]
pub fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// `ln(1 + e^x)`, evaluated without overflow for large `x`
#[inline]
pub fn softplus(v: f32) -> f32 {
    if v > 20.0 {
        v
    } else {
        v.exp().ln_1p()
    }
}
