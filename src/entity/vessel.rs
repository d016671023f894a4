use serde::{Deserialize, Serialize};

use super::Kinematics;
use crate::error::{ColavError, Result};
use crate::geometry::{angle_to_2pi, dtr, Position};

/// Discrete heading control of a vessel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingCommand {
    Keep,
    Starboard,
    Port,
}

impl HeadingCommand {
    pub const COUNT: usize = 3;

    /// Map a discrete action index (0 keep, 1 starboard, 2 port) to a command
    pub fn from_index(action: usize) -> Result<Self> {
        match action {
            0 => Ok(HeadingCommand::Keep),
            1 => Ok(HeadingCommand::Starboard),
            2 => Ok(HeadingCommand::Port),
            _ => Err(ColavError::InvalidAction {
                action,
                max_actions: Self::COUNT,
            }),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            HeadingCommand::Keep => 0,
            HeadingCommand::Starboard => 1,
            HeadingCommand::Port => 2,
        }
    }

    pub fn is_turn(&self) -> bool {
        !matches!(self, HeadingCommand::Keep)
    }
}

/// Point-mass vessel moving at constant speed along its heading
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vessel {
    pub position: Position,
    /// Heading in `[0, 2π)`
    pub heading: f64,
    /// Speed over ground (m/s)
    pub speed: f64,
    /// Integration step (s)
    pub delta_t: f64,
    /// Heading change per turn command (rad)
    pub turn_increment: f64,
}

impl Vessel {
    pub fn new(position: Position, heading: f64, speed: f64, delta_t: f64) -> Self {
        Vessel {
            position,
            heading: angle_to_2pi(heading),
            speed,
            delta_t,
            turn_increment: dtr(2.0),
        }
    }

    pub fn with_turn_increment(mut self, turn_increment: f64) -> Self {
        self.turn_increment = turn_increment;
        self
    }

    fn steer(&mut self, command: HeadingCommand) {
        match command {
            HeadingCommand::Keep => {}
            HeadingCommand::Starboard => self.heading += self.turn_increment,
            HeadingCommand::Port => self.heading -= self.turn_increment,
        }
        self.heading = angle_to_2pi(self.heading);
    }
}

impl Kinematics for Vessel {
    type Control = HeadingCommand;

    fn advance(&mut self, control: HeadingCommand) {
        self.steer(control);
        self.position = self.position.advanced(self.heading, self.speed * self.delta_t);
    }

    fn position(&self) -> Position {
        self.position
    }

    fn heading(&self) -> f64 {
        self.heading
    }

    // no drift: course over ground equals heading
    fn course(&self) -> f64 {
        self.heading
    }

    fn speed(&self) -> f64 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_vessel_moves_along_heading() {
        let mut vessel = Vessel::new(Position::new(0.0, 0.0), PI / 2.0, 2.0, 3.0);
        vessel.advance(HeadingCommand::Keep);

        assert!((vessel.position.east - 6.0).abs() < 1e-9);
        assert!(vessel.position.north.abs() < 1e-9);
    }

    #[test]
    fn test_turn_commands_wrap_heading() {
        let mut vessel = Vessel::new(Position::default(), 0.0, 0.0, 1.0);
        vessel.advance(HeadingCommand::Port);
        assert!((vessel.heading - (2.0 * PI - dtr(2.0))).abs() < 1e-9);

        vessel.advance(HeadingCommand::Starboard);
        vessel.advance(HeadingCommand::Starboard);
        assert!((vessel.heading - dtr(2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_action_index() {
        assert!(HeadingCommand::from_index(2).is_ok());
        match HeadingCommand::from_index(3) {
            Err(ColavError::InvalidAction { action, max_actions }) => {
                assert_eq!(action, 3);
                assert_eq!(max_actions, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
