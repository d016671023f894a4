//! # Environment Module
//!
//! Step loops that move entities, encode what the learning agent sees and score the result.
//!
//! - [`MaritimeEnv`] - one own ship steering around crossing target ships towards a goal
//! - [`UamEnv`] - a fleet of air taxis sharing one vertiport
//!
//! Every tick runs in a fixed order and nothing is parallelized across entities. Rendering
//! is write-only: an environment hands a [`Frame`] to a [`Renderer`] and never reads back.

pub mod maritime;
pub mod uam;

pub use maritime::MaritimeEnv;
pub use uam::{Destination, UamEnv};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::EntityState;
use crate::error::{ColavError, Result};
use crate::geometry::Position;
use crate::observation::{Observation, Situation};

/// Fail when a policy accepts fewer past observations than the environment keeps per track
pub(crate) fn check_policy_history(policy_length: usize, env_length: usize) -> Result<()> {
    if policy_length < env_length {
        return Err(ColavError::invalid_parameter(
            "history_length",
            format!(
                "policy reads {} past observations but the environment keeps {}",
                policy_length, env_length
            ),
        ));
    }
    Ok(())
}

/// Common interface of the step loops
pub trait Environment {
    type Action;

    /// Start a new episode and return its first observation
    fn reset(&mut self) -> Result<Observation>;

    /// Apply `action` and advance the world by one tick
    fn step(&mut self, action: Self::Action) -> Result<Transition>;

    /// Picture of the current tick for a renderer
    fn frame(&self) -> Frame;
}

/// Outcome of one tick
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub breakdown: RewardBreakdown,
}

/// Weighted reward components; their sum is the reward
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub distance: f64,
    pub heading: f64,
    pub collision: f64,
    pub colreg: f64,
    pub comfort: f64,
    pub goal: f64,
}

impl RewardBreakdown {
    pub fn total(&self) -> f64 {
        self.distance + self.heading + self.collision + self.colreg + self.comfort + self.goal
    }
}

/// State of the previous tick, read by the reward of the current one
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickSnapshot {
    pub step: usize,
    /// Situation of every other entity, in entity order
    pub situations: Vec<Situation>,
}

impl TickSnapshot {
    pub fn situation(&self, index: usize) -> Situation {
        self.situations.get(index).copied().unwrap_or_default()
    }
}

/// Everything a renderer may show of one tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub step: usize,
    pub sim_time: f64,
    pub own: EntityState,
    pub others: Vec<EntityState>,
    pub goal: Position,
    pub reward: f64,
}

/// Sink for frames
pub trait Renderer {
    fn render(&mut self, frame: &Frame) -> Result<()>;
}

/// Renderer that emits every frame as a `tracing` event
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        debug!(
            "step {} (t = {:.0} s): own N {:.1} E {:.1} heading {:.1} deg, {} others, reward {:.4}",
            frame.step,
            frame.sim_time,
            frame.own.position.north,
            frame.own.position.east,
            frame.own.heading.to_degrees(),
            frame.others.len(),
            frame.reward
        );
        Ok(())
    }
}
