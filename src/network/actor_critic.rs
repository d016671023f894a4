//! Actors and critics built from a [`SpatialTemporalEncoder`] and a head.
//!
//! Every assembly owns its own encoder; actors and critics never share parameters.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::heads::{
    argmax, DeterministicHead, DiscreteHead, GaussianHead, GaussianSample, ValueHead,
};
use super::recurrent::{SpatialTemporalEncoder, TrackInput};
use crate::config::EncoderConfig;
use crate::error::{ColavError, Result};
use crate::history::HistoryBuffer;
use crate::observation::Observation;

/// Anything that turns the current observation of a track and its history into an action
pub trait Policy {
    type Action;

    /// Largest number of past observations the policy accepts
    fn history_length(&self) -> usize;

    fn select_action(
        &self,
        observation: &Observation,
        history: &HistoryBuffer<Observation>,
    ) -> Result<Self::Action>;
}

/// Deterministic actor producing continuous actions in `[-1, 1]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentActor {
    pub encoder: SpatialTemporalEncoder,
    pub head: DeterministicHead,
}

impl RecurrentActor {
    pub fn new<R: Rng + ?Sized>(
        config: &EncoderConfig,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let encoder = SpatialTemporalEncoder::new(config, rng)?;
        let head =
            DeterministicHead::new(encoder.latent_size(), config.head_hidden, action_dim, rng)?;
        Ok(RecurrentActor { encoder, head })
    }

    pub fn forward<'a, I>(&self, current: &'a Observation, history: I) -> Result<Array1<f32>>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let latent = self.encoder.encode(current, history)?;
        self.head.forward(latent.view())
    }

    /// One action per track, row `b` for `tracks[b]`
    pub fn forward_batch(&self, tracks: &[TrackInput]) -> Result<Array2<f32>> {
        let latents = self.encoder.encode_batch(tracks)?;
        self.head.forward_batch(latents.view())
    }
}

impl Policy for RecurrentActor {
    type Action = Array1<f32>;

    fn history_length(&self) -> usize {
        self.encoder.history_length()
    }

    fn select_action(
        &self,
        observation: &Observation,
        history: &HistoryBuffer<Observation>,
    ) -> Result<Array1<f32>> {
        self.forward(observation, history.iter())
    }
}

/// Stochastic actor with a squashed Gaussian head
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentGaussianActor {
    pub encoder: SpatialTemporalEncoder,
    pub head: GaussianHead,
}

impl RecurrentGaussianActor {
    pub fn new<R: Rng + ?Sized>(
        config: &EncoderConfig,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let encoder = SpatialTemporalEncoder::new(config, rng)?;
        let head = GaussianHead::new(encoder.latent_size(), config.head_hidden, action_dim, rng)?;
        Ok(RecurrentGaussianActor { encoder, head })
    }

    pub fn forward<'a, I, R>(
        &self,
        current: &'a Observation,
        history: I,
        deterministic: bool,
        with_log_prob: bool,
        rng: &mut R,
    ) -> Result<GaussianSample>
    where
        I: IntoIterator<Item = &'a Observation>,
        R: Rng + ?Sized,
    {
        let latent = self.encoder.encode(current, history)?;
        self.head.forward(latent.view(), deterministic, with_log_prob, rng)
    }
}

/// State-action value of one track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentCritic {
    pub encoder: SpatialTemporalEncoder,
    pub head: ValueHead,
}

impl RecurrentCritic {
    pub fn new<R: Rng + ?Sized>(
        config: &EncoderConfig,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let encoder = SpatialTemporalEncoder::new(config, rng)?;
        let head = ValueHead::new(encoder.latent_size(), action_dim, config.head_hidden, rng)?;
        Ok(RecurrentCritic { encoder, head })
    }

    pub fn forward<'a, I>(
        &self,
        current: &'a Observation,
        history: I,
        action: ArrayView1<f32>,
    ) -> Result<f32>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let latent = self.encoder.encode(current, history)?;
        self.head.forward(latent.view(), action)
    }

    /// Values of several tracks; `actions` holds one row per track
    pub fn forward_batch(
        &self,
        tracks: &[TrackInput],
        actions: ArrayView2<f32>,
    ) -> Result<Array1<f32>> {
        if actions.nrows() != tracks.len() {
            return Err(ColavError::dimension_mismatch(
                format!("{} action rows", tracks.len()),
                format!("{} action rows", actions.nrows()),
            ));
        }
        let latents = self.encoder.encode_batch(tracks)?;
        latents
            .rows()
            .into_iter()
            .zip(actions.rows())
            .map(|(latent, action)| self.head.forward(latent, action))
            .collect()
    }
}

/// Two independent critics, as used by clipped double-Q learning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentDoubleCritic {
    pub q1: RecurrentCritic,
    pub q2: RecurrentCritic,
}

impl RecurrentDoubleCritic {
    pub fn new<R: Rng + ?Sized>(
        config: &EncoderConfig,
        action_dim: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(RecurrentDoubleCritic {
            q1: RecurrentCritic::new(config, action_dim, rng)?,
            q2: RecurrentCritic::new(config, action_dim, rng)?,
        })
    }

    pub fn forward(
        &self,
        current: &Observation,
        history: &[&Observation],
        action: ArrayView1<f32>,
    ) -> Result<(f32, f32)> {
        let q1 = self.q1.forward(current, history.iter().copied(), action)?;
        let q2 = self.q2.forward(current, history.iter().copied(), action)?;
        Ok((q1, q2))
    }

    /// Value of the first critic only
    pub fn single_forward(
        &self,
        current: &Observation,
        history: &[&Observation],
        action: ArrayView1<f32>,
    ) -> Result<f32> {
        self.q1.forward(current, history.iter().copied(), action)
    }
}

/// Q-values over a discrete action set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurrentQNetwork {
    pub encoder: SpatialTemporalEncoder,
    pub head: DiscreteHead,
}

impl RecurrentQNetwork {
    pub fn new<R: Rng + ?Sized>(
        config: &EncoderConfig,
        num_actions: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let encoder = SpatialTemporalEncoder::new(config, rng)?;
        let head = DiscreteHead::new(encoder.latent_size(), config.head_hidden, num_actions, rng)?;
        Ok(RecurrentQNetwork { encoder, head })
    }

    pub fn forward<'a, I>(&self, current: &'a Observation, history: I) -> Result<Array1<f32>>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let latent = self.encoder.encode(current, history)?;
        self.head.forward(latent.view())
    }
}

impl Policy for RecurrentQNetwork {
    type Action = usize;

    fn history_length(&self) -> usize {
        self.encoder.history_length()
    }

    /// Greedy action
    fn select_action(
        &self,
        observation: &Observation,
        history: &HistoryBuffer<Observation>,
    ) -> Result<usize> {
        let q_values = self.forward(observation, history.iter())?;
        argmax(q_values.view()).ok_or_else(|| ColavError::invariant("Q-network without any action"))
    }
}
