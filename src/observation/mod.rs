//! # Observation Module
//!
//! Fixed-size observations built from a variable number of other entities.
//!
//! An [`Observation`] holds the own-entity features plus up to `capacity` feature blocks,
//! one per observed entity. Slots beyond the present blocks are *absent*: they are tagged
//! rather than filled, so "no entity" can never be confused with "entity at distance zero".
//! The flat form handed to numeric consumers ([`Observation::to_padded`]) always has length
//! `own_features + capacity * block_width` and marks absent slots with NaN.
//!
//! ## Submodules
//!
//! - [`risk`] - continuous collision-risk scalar in `[0, 1]`
//! - [`colreg`] - instantaneous right-of-way situation classifier
//! - [`encoder`] - builders for the maritime and air-mobility observations

pub mod colreg;
pub mod encoder;
pub mod risk;

pub use colreg::{classify_situation, Situation};
pub use encoder::{MaritimeEncoder, StateDesign, TargetOrdering, UamEncoder, VertiportTiming};
pub use risk::{collision_risk, RiskParams};

use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{ColavError, Result};

/// Shape of an observation: own features followed by `capacity` blocks of `block_width`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationLayout {
    pub own_features: usize,
    pub block_width: usize,
    pub capacity: usize,
}

impl ObservationLayout {
    pub fn new(own_features: usize, block_width: usize, capacity: usize) -> Result<Self> {
        if block_width == 0 {
            return Err(ColavError::invalid_parameter("block_width", "must be positive"));
        }
        if capacity == 0 {
            return Err(ColavError::invalid_parameter(
                "capacity",
                "must hold at least one block",
            ));
        }
        Ok(ObservationLayout {
            own_features,
            block_width,
            capacity,
        })
    }

    /// Length of the flat, padded representation
    pub fn flat_len(&self) -> usize {
        self.own_features + self.capacity * self.block_width
    }
}

/// Observation with explicitly present and absent entity slots
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    layout: ObservationLayout,
    own: Array1<f32>,
    blocks: Vec<Array1<f32>>,
}

impl Observation {
    /// Build an observation; `blocks` fill the first slots, the rest are absent
    pub fn new(
        layout: ObservationLayout,
        own: Array1<f32>,
        blocks: Vec<Array1<f32>>,
    ) -> Result<Self> {
        if own.len() != layout.own_features {
            return Err(ColavError::dimension_mismatch(
                format!("{} own features", layout.own_features),
                format!("{} own features", own.len()),
            ));
        }
        if blocks.len() > layout.capacity {
            return Err(ColavError::dimension_mismatch(
                format!("at most {} blocks", layout.capacity),
                format!("{} blocks", blocks.len()),
            ));
        }
        if let Some(block) = blocks.iter().find(|b| b.len() != layout.block_width) {
            return Err(ColavError::dimension_mismatch(
                format!("block width {}", layout.block_width),
                format!("block width {}", block.len()),
            ));
        }
        Ok(Observation { layout, own, blocks })
    }

    /// Observation whose own features and every slot are zero-valued and present
    pub fn zeros(layout: ObservationLayout) -> Self {
        Observation {
            layout,
            own: Array1::zeros(layout.own_features),
            blocks: vec![Array1::zeros(layout.block_width); layout.capacity],
        }
    }

    pub fn layout(&self) -> ObservationLayout {
        self.layout
    }

    pub fn own(&self) -> ArrayView1<'_, f32> {
        self.own.view()
    }

    pub fn blocks(&self) -> &[Array1<f32>] {
        &self.blocks
    }

    /// Number of present entity blocks
    pub fn cardinality(&self) -> usize {
        self.blocks.len()
    }

    /// Block in slot `index`, `None` when the slot is absent
    pub fn slot(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        self.blocks.get(index).map(|b| b.view())
    }

    /// Present blocks stacked row-wise, shape `(cardinality, block_width)`
    pub fn block_matrix(&self) -> Array2<f32> {
        let mut matrix = Array2::zeros((self.blocks.len(), self.layout.block_width));
        for (mut row, block) in matrix.rows_mut().into_iter().zip(&self.blocks) {
            row.assign(block);
        }
        matrix
    }

    /// Flat vector with absent slots filled by NaN
    pub fn to_padded(&self) -> Array1<f32> {
        let own_features = self.layout.own_features;
        let width = self.layout.block_width;

        let mut flat = Array1::from_elem(self.layout.flat_len(), f32::NAN);
        flat.slice_mut(s![..own_features]).assign(&self.own);
        for (i, block) in self.blocks.iter().enumerate() {
            let start = own_features + i * width;
            flat.slice_mut(s![start..start + width]).assign(block);
        }
        flat
    }

    /// Parse the flat form; a slot is present when its first feature is not NaN
    pub fn from_padded(layout: ObservationLayout, flat: ArrayView1<f32>) -> Result<Self> {
        if flat.len() != layout.flat_len() {
            return Err(ColavError::dimension_mismatch(
                format!("flat length {}", layout.flat_len()),
                format!("flat length {}", flat.len()),
            ));
        }

        let own = flat.slice(s![..layout.own_features]).to_owned();
        let mut blocks = Vec::with_capacity(layout.capacity);
        let mut seen_absent = false;

        for i in 0..layout.capacity {
            let start = layout.own_features + i * layout.block_width;
            let block = flat.slice(s![start..start + layout.block_width]);
            if block[0].is_nan() {
                seen_absent = true;
                continue;
            }
            if seen_absent {
                return Err(ColavError::invariant(format!(
                    "present block in slot {} follows an absent slot",
                    i
                )));
            }
            // stray NaN inside a present block would poison the recurrence
            blocks.push(block.mapv(|v| if v.is_nan() { 0.0 } else { v }));
        }

        Ok(Observation { layout, own, blocks })
    }
}

/// Sort, truncate and pack entity blocks into an observation.
///
/// The sort is stable, so blocks with equal keys keep their detection order. Truncation
/// keeps the tail of the sorted sequence, which holds the highest-priority blocks.
pub fn pack_blocks(
    layout: ObservationLayout,
    own: Array1<f32>,
    mut blocks: Vec<Array1<f32>>,
    ordering: TargetOrdering,
) -> Result<Observation> {
    if blocks.is_empty() {
        return Err(ColavError::invariant(
            "no entity block to encode, expected at least a placeholder",
        ));
    }

    ordering.sort(&mut blocks);

    if blocks.len() > layout.capacity {
        let excess = blocks.len() - layout.capacity;
        blocks.drain(..excess);
    }

    Observation::new(layout, own, blocks)
}
