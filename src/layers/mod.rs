//! # Layers Module
//!
//! Forward-only building blocks of the actor and critic networks. Parameters are plain
//! `ndarray` values owned by the layer; they are drawn from a caller-supplied RNG so that
//! identically seeded constructions produce identical networks.

pub mod dense;
pub mod gru;
pub mod initialization;
pub mod lstm;
pub mod traits;

pub use dense::DenseLayer;
pub use gru::GruLayer;
pub use initialization::WeightInit;
pub use lstm::LstmLayer;
pub use traits::{Layer, SequenceModel};

use ndarray::{Array3, ArrayView3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which recurrent cell a sequence model uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrentKind {
    #[default]
    Gru,
    Lstm,
}

/// A sequence model selected by [`RecurrentKind`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecurrentLayer {
    Gru(GruLayer),
    Lstm(LstmLayer),
}

impl RecurrentLayer {
    pub fn new<R: Rng + ?Sized>(
        kind: RecurrentKind,
        input_size: usize,
        hidden_size: usize,
        rng: &mut R,
    ) -> Self {
        match kind {
            RecurrentKind::Gru => RecurrentLayer::Gru(GruLayer::new(input_size, hidden_size, rng)),
            RecurrentKind::Lstm => {
                RecurrentLayer::Lstm(LstmLayer::new(input_size, hidden_size, rng))
            }
        }
    }

    pub fn kind(&self) -> RecurrentKind {
        match self {
            RecurrentLayer::Gru(_) => RecurrentKind::Gru,
            RecurrentLayer::Lstm(_) => RecurrentKind::Lstm,
        }
    }
}

impl SequenceModel for RecurrentLayer {
    fn forward_sequence(&self, input: ArrayView3<f32>) -> Array3<f32> {
        match self {
            RecurrentLayer::Gru(layer) => layer.forward_sequence(input),
            RecurrentLayer::Lstm(layer) => layer.forward_sequence(input),
        }
    }

    fn input_size(&self) -> usize {
        match self {
            RecurrentLayer::Gru(layer) => layer.input_size,
            RecurrentLayer::Lstm(layer) => layer.input_size,
        }
    }

    fn hidden_size(&self) -> usize {
        match self {
            RecurrentLayer::Gru(layer) => layer.hidden_size,
            RecurrentLayer::Lstm(layer) => layer.hidden_size,
        }
    }
}
