//! # Entity Models
//!
//! Kinematic models of the moving objects in an environment. Every model advances itself
//! once per tick from a control input and exposes read accessors; observation code only ever
//! sees [`EntityState`] snapshots, never the models themselves.
//!
//! - [`Vessel`] - point-mass ship steered by discrete heading increments
//! - [`Aircraft`] - flight taxi steered by a continuous turn-rate command

pub mod aircraft;
pub mod vessel;

pub use aircraft::Aircraft;
pub use vessel::{HeadingCommand, Vessel};

use crate::geometry::{Position, Track};
use serde::{Deserialize, Serialize};

/// Immutable kinematic snapshot of an entity taken at one tick
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub position: Position,
    /// Direction the bow/nose points to (rad)
    pub heading: f64,
    /// Direction of travel over ground (rad)
    pub course: f64,
    /// Speed over ground (m/s)
    pub speed: f64,
}

impl EntityState {
    /// Constant-velocity track used for CPA computations
    pub fn track(&self) -> Track {
        Track {
            position: self.position,
            course: self.course,
            speed: self.speed,
        }
    }
}

/// Dynamics interface of an entity
pub trait Kinematics {
    type Control;

    /// Apply the control input and integrate the dynamics over one tick
    fn advance(&mut self, control: Self::Control);

    fn position(&self) -> Position;

    fn heading(&self) -> f64;

    fn course(&self) -> f64;

    fn speed(&self) -> f64;

    fn snapshot(&self) -> EntityState {
        EntityState {
            position: self.position(),
            heading: self.heading(),
            course: self.course(),
            speed: self.speed(),
        }
    }
}
