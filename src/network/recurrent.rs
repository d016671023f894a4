//! Spatial-temporal encoders.
//!
//! The [`SpatialTemporalEncoder`] runs two nested recurrences. The inner one
//! ([`InnerEncoder`]) reads the entity blocks of a single observation as a sequence and
//! summarizes them into a latent vector. The outer one reads the latent vectors of the last
//! `K` ticks plus the current one as a time series.
//!
//! Entity blocks are ordered least to most relevant, so the inner output is read at the
//! last present block.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::concat;
use crate::activations::Activation;
use crate::config::EncoderConfig;
use crate::error::{ColavError, Result};
use crate::history::{mask_empty, selection_index};
use crate::layers::{DenseLayer, Layer, RecurrentKind, RecurrentLayer, SequenceModel};
use crate::observation::{Observation, ObservationLayout};

/// Inner recurrence over the entity blocks of one observation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InnerEncoder {
    layout: ObservationLayout,
    own_dense: DenseLayer,
    block_recurrence: RecurrentLayer,
    block_dense: DenseLayer,
}

impl InnerEncoder {
    pub fn new<R: Rng + ?Sized>(
        layout: ObservationLayout,
        hidden_size: usize,
        kind: RecurrentKind,
        rng: &mut R,
    ) -> Self {
        InnerEncoder {
            layout,
            own_dense: DenseLayer::new(layout.own_features, hidden_size, Activation::Relu, rng),
            block_recurrence: RecurrentLayer::new(kind, layout.block_width, hidden_size, rng),
            block_dense: DenseLayer::new(hidden_size, hidden_size, Activation::Relu, rng),
        }
    }

    pub fn layout(&self) -> ObservationLayout {
        self.layout
    }

    /// Width of the latent vector: own-feature half plus entity half
    pub fn latent_size(&self) -> usize {
        self.own_dense.output_size() + self.block_dense.output_size()
    }

    pub fn forward(&self, observation: &Observation) -> Result<Array1<f32>> {
        if observation.layout() != self.layout {
            return Err(ColavError::dimension_mismatch(
                format!("{:?}", self.layout),
                format!("{:?}", observation.layout()),
            ));
        }

        let cardinality = observation.cardinality();
        if cardinality == 0 {
            return Err(ColavError::invariant(
                "observation without any entity block reached the inner recurrence",
            ));
        }

        let own = self.own_dense.forward(observation.own());

        let blocks = observation.block_matrix().insert_axis(Axis(0));
        let states = self.block_recurrence.forward_sequence(blocks.view());
        let entities = self.block_dense.forward(states.slice(s![0, cardinality - 1, ..]));

        Ok(concat(own.view(), entities.view()))
    }

    /// Same as [`forward`](Self::forward) on the NaN-padded flat form
    pub fn forward_padded(&self, flat: ArrayView1<f32>) -> Result<Array1<f32>> {
        let observation = Observation::from_padded(self.layout, flat)?;
        self.forward(&observation)
    }
}

/// Current observation and history of one track, the unit of batched encoding
#[derive(Clone, Debug)]
pub struct TrackInput<'a> {
    pub current: &'a Observation,
    /// Past observations, oldest first
    pub history: Vec<&'a Observation>,
}

impl<'a> TrackInput<'a> {
    pub fn new<I>(current: &'a Observation, history: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        TrackInput {
            current,
            history: history.into_iter().collect(),
        }
    }
}

/// Inner recurrence per tick followed by an outer recurrence over ticks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialTemporalEncoder {
    /// One inner encoder per lag; index 0 encodes the current tick
    inner: Vec<InnerEncoder>,
    outer: RecurrentLayer,
    history_length: usize,
}

impl SpatialTemporalEncoder {
    pub fn new<R: Rng + ?Sized>(config: &EncoderConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let layout = config.layout()?;

        let inner: Vec<InnerEncoder> = (0..=config.history_length)
            .map(|_| InnerEncoder::new(layout, config.inner_hidden, config.recurrent, rng))
            .collect();
        let outer = RecurrentLayer::new(
            config.recurrent,
            2 * config.inner_hidden,
            config.outer_hidden,
            rng,
        );

        Ok(SpatialTemporalEncoder {
            inner,
            outer,
            history_length: config.history_length,
        })
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    pub fn layout(&self) -> ObservationLayout {
        self.inner[0].layout()
    }

    pub fn latent_size(&self) -> usize {
        self.outer.hidden_size()
    }

    /// Encode one track
    pub fn encode<'a, I>(&self, current: &'a Observation, history: I) -> Result<Array1<f32>>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let history: Vec<&Observation> = history.into_iter().collect();
        let sequence = self.latent_sequence(current, &history)?.insert_axis(Axis(0));
        let states = self.outer.forward_sequence(sequence.view());
        Ok(states.slice(s![0, history.len(), ..]).to_owned())
    }

    /// Encode several tracks with a single outer pass; row `b` belongs to `tracks[b]`
    pub fn encode_batch(&self, tracks: &[TrackInput]) -> Result<Array2<f32>> {
        let steps = self.history_length + 1;
        let latent = self.inner[0].latent_size();

        let mut sequences = Array3::zeros((tracks.len(), steps, latent));
        for (mut slot, track) in sequences.axis_iter_mut(Axis(0)).zip(tracks) {
            slot.assign(&self.latent_sequence(track.current, &track.history)?);
        }

        let states = self.outer.forward_sequence(sequences.view());

        let mut output = Array2::zeros((tracks.len(), self.latent_size()));
        for (b, track) in tracks.iter().enumerate() {
            output.row_mut(b).assign(&states.slice(s![b, track.history.len(), ..]));
        }
        Ok(output)
    }

    /// Outer input of one track, rolled so the current tick sits at index `h`
    fn latent_sequence(
        &self,
        current: &Observation,
        history: &[&Observation],
    ) -> Result<Array2<f32>> {
        let k = self.history_length;
        let h = history.len();
        if h > k {
            return Err(ColavError::dimension_mismatch(
                format!("at most {} history entries", k),
                format!("{} history entries", h),
            ));
        }

        // right-aligned; slots before the first entry stay zero
        let mut sequence = Array2::zeros((k + 1, self.inner[0].latent_size()));
        for (i, observation) in history.iter().enumerate() {
            let slot = k - h + i;
            sequence.row_mut(slot).assign(&self.inner[k - slot].forward(observation)?);
        }
        sequence.row_mut(k).assign(&self.inner[0].forward(current)?);

        Ok(roll_left(sequence.view(), k - h))
    }
}

/// Rotate the rows of `sequence` so that row `shift` becomes row 0
fn roll_left(sequence: ArrayView2<f32>, shift: usize) -> Array2<f32> {
    let steps = sequence.nrows();
    if steps == 0 || shift % steps == 0 {
        return sequence.to_owned();
    }
    let mut rolled = Array2::zeros(sequence.dim());
    for (i, row) in sequence.axis_iter(Axis(0)).enumerate() {
        rolled.row_mut((i + steps - shift % steps) % steps).assign(&row);
    }
    rolled
}

/// Recurrent encoder over a flat history of fixed-size observations.
///
/// The current observation passes through two dense layers; the history passes through a
/// dense layer and a sequence model whose output is read at the last valid step. Tracks
/// without history contribute a zero memory vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEncoder {
    current_dense: [DenseLayer; 2],
    memory_dense: DenseLayer,
    memory: RecurrentLayer,
}

impl HistoryEncoder {
    pub fn new<R: Rng + ?Sized>(
        state_size: usize,
        hidden_size: usize,
        kind: RecurrentKind,
        rng: &mut R,
    ) -> Self {
        HistoryEncoder {
            current_dense: [
                DenseLayer::new(state_size, hidden_size, Activation::Relu, rng),
                DenseLayer::new(hidden_size, hidden_size, Activation::Relu, rng),
            ],
            memory_dense: DenseLayer::new(state_size, hidden_size, Activation::Relu, rng),
            memory: RecurrentLayer::new(kind, hidden_size, hidden_size, rng),
        }
    }

    pub fn state_size(&self) -> usize {
        self.memory_dense.input_size()
    }

    pub fn latent_size(&self) -> usize {
        self.current_dense[1].output_size() + self.memory.hidden_size()
    }

    /// `history` has one row per past step, valid rows first
    pub fn forward(
        &self,
        state: ArrayView1<f32>,
        history: ArrayView2<f32>,
        valid_length: usize,
    ) -> Result<Array1<f32>> {
        let latent = self.forward_batch(
            state.insert_axis(Axis(0)),
            history.insert_axis(Axis(0)),
            &[valid_length],
        )?;
        Ok(latent.row(0).to_owned())
    }

    /// Batched form; `histories` has shape `(batch, steps, state_size)`
    pub fn forward_batch(
        &self,
        states: ArrayView2<f32>,
        histories: ArrayView3<f32>,
        valid_lengths: &[usize],
    ) -> Result<Array2<f32>> {
        let (batch, steps, width) = histories.dim();
        if states.ncols() != self.state_size() || width != self.state_size() {
            return Err(ColavError::dimension_mismatch(
                format!("state size {}", self.state_size()),
                format!("state size {} / history width {}", states.ncols(), width),
            ));
        }
        if states.nrows() != batch || valid_lengths.len() != batch {
            return Err(ColavError::dimension_mismatch(
                format!("batch of {}", batch),
                format!("{} states and {} valid lengths", states.nrows(), valid_lengths.len()),
            ));
        }
        if let Some(&h) = valid_lengths.iter().find(|&&h| h > steps) {
            return Err(ColavError::dimension_mismatch(
                format!("valid length at most {}", steps),
                format!("valid length {}", h),
            ));
        }

        let current = self.current_dense[0].forward_batch(states);
        let current = self.current_dense[1].forward_batch(current.view());

        let flat = histories
            .to_owned()
            .into_shape((batch * steps, width))
            .map_err(|e| ColavError::Numerical(e.to_string()))?;
        let embedded = self
            .memory_dense
            .forward_batch(flat.view())
            .into_shape((batch, steps, self.memory_dense.output_size()))
            .map_err(|e| ColavError::Numerical(e.to_string()))?;
        let memories = self.memory.forward_sequence(embedded.view());

        let mut selected = Array2::zeros((batch, self.memory.hidden_size()));
        if steps > 0 {
            for (b, &h) in valid_lengths.iter().enumerate() {
                selected.row_mut(b).assign(&memories.slice(s![b, selection_index(h), ..]));
            }
        }
        mask_empty(&mut selected, valid_lengths)?;

        let mut latent = Array2::zeros((batch, self.latent_size()));
        for (b, mut row) in latent.axis_iter_mut(Axis(0)).enumerate() {
            row.assign(&concat(current.row(b), selected.row(b)));
        }
        Ok(latent)
    }
}
