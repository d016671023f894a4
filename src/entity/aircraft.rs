use serde::{Deserialize, Serialize};

use super::Kinematics;
use crate::geometry::{angle_to_2pi, dtr, Position};

/// Flight taxi at constant altitude and true airspeed, steered by a turn-rate command
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Aircraft {
    pub position: Position,
    /// Heading in `[0, 2π)`
    pub heading: f64,
    /// True airspeed (m/s)
    pub tas: f64,
    /// Integration step (s)
    pub delta_t: f64,
    /// Turn rate at full deflection (rad/s)
    pub max_turn_rate: f64,
    /// Ticks since the aircraft last entered the vertiport or the episode began
    pub lifetime: u32,
}

impl Aircraft {
    pub fn new(position: Position, heading: f64, tas: f64, delta_t: f64) -> Self {
        Aircraft {
            position,
            heading: angle_to_2pi(heading),
            tas,
            delta_t,
            max_turn_rate: dtr(3.0),
            lifetime: 0,
        }
    }

    pub fn with_lifetime(mut self, lifetime: u32) -> Self {
        self.lifetime = lifetime;
        self
    }
}

impl Kinematics for Aircraft {
    /// Normalized turn command, clipped to `[-1, 1]`; positive turns to starboard
    type Control = f64;

    fn advance(&mut self, control: f64) {
        let command = if control.is_finite() { control.clamp(-1.0, 1.0) } else { 0.0 };
        self.heading = angle_to_2pi(self.heading + command * self.max_turn_rate * self.delta_t);
        self.position = self.position.advanced(self.heading, self.tas * self.delta_t);
    }

    fn position(&self) -> Position {
        self.position
    }

    fn heading(&self) -> f64 {
        self.heading
    }

    fn course(&self) -> f64 {
        self.heading
    }

    fn speed(&self) -> f64 {
        self.tas
    }
}
