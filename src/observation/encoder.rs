//! Observation builders for the two environment families.
//!
//! Both encoders are pure functions of the snapshots they are given: the same inputs always
//! produce the same observation, and nothing is cached between calls.

use std::cmp::Ordering;
use std::f64::consts::PI;

use ndarray::{arr1, Array1};
use serde::{Deserialize, Serialize};

use super::colreg::Situation;
use super::risk::{collision_risk, RiskParams};
use super::{pack_blocks, Observation, ObservationLayout};
use crate::entity::EntityState;
use crate::error::{ColavError, Result};
use crate::geometry::{
    angle_to_pi, bearing_abs, bearing_rel_pi, heading_intersection_pi, nm_to_meter, Position,
};

/// Ordering of entity blocks before truncation; the last block is the most relevant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetOrdering {
    /// Ascending by the feature at the given block index
    Ascending(usize),
    /// Descending by the feature at the given block index
    Descending(usize),
    /// Detection order
    Natural,
}

impl TargetOrdering {
    /// Stable sort, so equal keys keep their detection order
    pub fn sort(&self, blocks: &mut [Array1<f32>]) {
        match *self {
            TargetOrdering::Ascending(key) => {
                blocks.sort_by(|a, b| compare_key(a, b, key));
            }
            TargetOrdering::Descending(key) => {
                blocks.sort_by(|a, b| compare_key(b, a, key));
            }
            TargetOrdering::Natural => {}
        }
    }
}

fn compare_key(a: &Array1<f32>, b: &Array1<f32>, key: usize) -> Ordering {
    match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => x.total_cmp(y),
        _ => Ordering::Equal,
    }
}

/// Which target blocks a maritime observation carries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateDesign {
    /// Every in-sight target, padded to the maximum target count
    #[default]
    Recurrent,
    /// Only the block with the highest collision risk
    MaxRisk,
}

/// Encoder of the own-ship and target-ship features of the maritime environment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaritimeEncoder {
    pub design: StateDesign,
    /// Maximum number of target ships that can be present
    pub max_targets: usize,
    /// Side length of the square world (m), used for distance normalization
    pub world_scale: f64,
    /// Detection range (m)
    pub sight: f64,
    /// Speed normalization constant (m/s)
    pub speed_scale: f64,
    pub risk: RiskParams,
}

impl MaritimeEncoder {
    pub const OWN_FEATURES: usize = 4;
    pub const BLOCK_WIDTH: usize = 6;

    /// Block emitted when no target is in sight: far away, abaft, no speed, no risk
    pub const PLACEHOLDER: [f32; 6] = [1.0, -1.0, -1.0, 0.0, 0.0, 0.0];

    /// Index of the collision risk inside a target block
    pub const RISK_INDEX: usize = 5;

    pub fn new(design: StateDesign, max_targets: usize) -> Self {
        MaritimeEncoder {
            design,
            max_targets,
            world_scale: 500.0,
            sight: nm_to_meter(20.0),
            speed_scale: 1.2,
            risk: RiskParams::default(),
        }
    }

    pub fn layout(&self) -> ObservationLayout {
        let capacity = match self.design {
            StateDesign::Recurrent => self.max_targets.max(1),
            StateDesign::MaxRisk => 1,
        };
        ObservationLayout {
            own_features: Self::OWN_FEATURES,
            block_width: Self::BLOCK_WIDTH,
            capacity,
        }
    }

    /// Own-ship and goal features
    pub fn own_features(&self, own: &EntityState, goal: &Position) -> Array1<f32> {
        let d_goal = own.position.distance_to(goal);
        arr1(&[
            (own.speed / self.speed_scale) as f32,
            (angle_to_pi(own.heading) / PI) as f32,
            (bearing_rel_pi(&own.position, goal, own.heading) / PI) as f32,
            (d_goal / (0.5 * self.world_scale)).min(1.0) as f32,
        ])
    }

    /// Feature block of one target, `None` when it is out of sight
    pub fn target_block(
        &self,
        own: &EntityState,
        target: &EntityState,
        situation: Situation,
    ) -> Option<Array1<f32>> {
        let distance = own.position.distance_to(&target.position);
        if distance > self.sight {
            return None;
        }

        Some(arr1(&[
            ((distance - self.risk.min_safe_distance) / self.world_scale) as f32,
            (bearing_rel_pi(&own.position, &target.position, own.heading) / PI) as f32,
            (heading_intersection_pi(own.heading, target.heading) / PI) as f32,
            (target.speed / self.speed_scale) as f32,
            situation.code() as f32,
            collision_risk(own, target, &self.risk) as f32,
        ]))
    }

    /// Build the observation of the own ship.
    ///
    /// `situations[i]` is the current classification of `targets[i]`.
    pub fn encode(
        &self,
        own: &EntityState,
        goal: &Position,
        targets: &[EntityState],
        situations: &[Situation],
    ) -> Result<Observation> {
        if targets.len() != situations.len() {
            return Err(ColavError::dimension_mismatch(
                format!("{} situations", targets.len()),
                format!("{} situations", situations.len()),
            ));
        }

        let mut blocks: Vec<Array1<f32>> = targets
            .iter()
            .zip(situations)
            .filter_map(|(target, situation)| self.target_block(own, target, *situation))
            .collect();

        if blocks.is_empty() {
            blocks.push(arr1(&Self::PLACEHOLDER));
        }

        pack_blocks(
            self.layout(),
            self.own_features(own, goal),
            blocks,
            TargetOrdering::Ascending(Self::RISK_INDEX),
        )
    }
}

/// Opening status of the vertiport as seen by every aircraft
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertiportTiming {
    /// Seconds until the vertiport opens again, zero while open
    pub t_next_open: f64,
    /// Seconds since the vertiport opened, zero while closed
    pub t_open_since: f64,
    /// Closing period after each entry (s)
    pub t_close: f64,
}

/// Encoder of the air-mobility observation of one aircraft
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UamEncoder {
    /// Largest fleet size the observation must accommodate
    pub max_agents: usize,
    /// Distance normalization, the radius at which aircraft spawn (m)
    pub spawn_radius: f64,
    /// Append a landing-priority flag to own features and blocks
    pub priority: bool,
}

impl UamEncoder {
    /// Index of the normalized distance inside a block
    pub const DISTANCE_INDEX: usize = 0;

    pub fn new(max_agents: usize, spawn_radius: f64, priority: bool) -> Result<Self> {
        if max_agents < 2 {
            return Err(ColavError::invalid_parameter(
                "max_agents",
                "need at least two aircraft",
            ));
        }
        Ok(UamEncoder {
            max_agents,
            spawn_radius,
            priority,
        })
    }

    pub fn layout(&self) -> ObservationLayout {
        let width = if self.priority { 5 } else { 4 };
        ObservationLayout {
            own_features: width,
            block_width: width,
            capacity: self.max_agents - 1,
        }
    }

    /// Build the observation of `fleet[own]`.
    ///
    /// `lifetimes` is only read when the priority flag is enabled; the aircraft with the
    /// longest lifetime holds the landing priority.
    pub fn encode(
        &self,
        own: usize,
        fleet: &[EntityState],
        lifetimes: &[u32],
        vertiport: &Position,
        timing: &VertiportTiming,
    ) -> Result<Observation> {
        let me = fleet.get(own).ok_or_else(|| {
            ColavError::invalid_parameter(
                "own",
                format!("index {} outside fleet of {}", own, fleet.len()),
            )
        })?;
        if self.priority && lifetimes.len() != fleet.len() {
            return Err(ColavError::dimension_mismatch(
                format!("{} lifetimes", fleet.len()),
                format!("{} lifetimes", lifetimes.len()),
            ));
        }

        let longest = lifetimes.iter().copied().max().unwrap_or(0);
        let priority_flag = |i: usize| -> f32 {
            if lifetimes[i] == longest {
                1.0
            } else {
                -1.0
            }
        };

        let bng_goal = angle_to_pi(bearing_abs(&me.position, vertiport) - me.heading);
        let mut own_features = vec![
            (bng_goal / PI) as f32,
            (me.position.distance_to(vertiport) / self.spawn_radius) as f32,
            (1.0 - timing.t_next_open / timing.t_close) as f32,
            (1.0 - timing.t_open_since / timing.t_close) as f32,
        ];
        if self.priority {
            own_features.push(priority_flag(own));
        }

        let blocks = fleet
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != own)
            .map(|(j, other)| {
                let bng = angle_to_pi(bearing_abs(&me.position, &other.position) - me.heading);
                let mut block = vec![
                    (me.position.distance_to(&other.position) / self.spawn_radius) as f32,
                    (bng / PI) as f32,
                    (other.speed - me.speed) as f32,
                    (heading_intersection_pi(me.heading, other.heading) / PI) as f32,
                ];
                if self.priority {
                    block.push(priority_flag(j));
                }
                Array1::from(block)
            })
            .collect();

        pack_blocks(
            self.layout(),
            Array1::from(own_features),
            blocks,
            TargetOrdering::Descending(Self::DISTANCE_INDEX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(north: f64, east: f64, heading: f64, speed: f64) -> EntityState {
        EntityState {
            position: Position::new(north, east),
            heading,
            course: heading,
            speed,
        }
    }

    #[test]
    fn test_stable_sort_keeps_detection_order() {
        let mut blocks = vec![arr1(&[1.0, 0.5]), arr1(&[2.0, 0.1]), arr1(&[3.0, 0.5])];
        TargetOrdering::Ascending(1).sort(&mut blocks);

        assert_eq!(blocks[0][0], 2.0);
        assert_eq!(blocks[1][0], 1.0);
        assert_eq!(blocks[2][0], 3.0);
    }

    #[test]
    fn test_max_risk_keeps_riskiest_target() {
        let encoder = MaritimeEncoder::new(StateDesign::MaxRisk, 3);
        let own = state(0.0, 0.0, 0.0, 1.2);
        let goal = Position::new(400.0, 0.0);

        let far = state(400.0, 200.0, PI, 1.2);
        let near = state(80.0, 0.0, PI, 1.2);
        let obs = encoder
            .encode(&own, &goal, &[near, far], &[Situation::HeadOn, Situation::None])
            .unwrap();

        assert_eq!(obs.cardinality(), 1);
        assert_eq!(obs.to_padded().len(), 4 + 6);
        assert_eq!(obs.blocks()[0][4], 1.0);
    }

    #[test]
    fn test_uam_blocks_sorted_by_distance_descending() {
        let encoder = UamEncoder::new(4, 1100.0, false).unwrap();
        let fleet = [
            state(500.0, 0.0, PI, 15.0),
            state(0.0, 100.0, 0.0, 15.0),
            state(0.0, 900.0, 0.0, 12.0),
            state(0.0, 300.0, 0.0, 18.0),
        ];
        let timing = VertiportTiming { t_next_open: 0.0, t_open_since: 0.0, t_close: 60.0 };

        let obs = encoder.encode(1, &fleet, &[0; 4], &Position::default(), &timing).unwrap();
        let distances: Vec<f32> = obs.blocks().iter().map(|b| b[0]).collect();

        assert_eq!(obs.cardinality(), 3);
        assert!(distances.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(obs.own()[2], 1.0);
    }
}
