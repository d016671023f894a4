use serde::{Deserialize, Serialize};

use crate::entity::EntityState;
use crate::geometry::{angle_to_pi, bearing_rel, project_vector, rtd};

/// Right-of-way situation of another entity, seen from the own entity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Situation {
    #[default]
    None,
    HeadOn,
    Overtaking,
    PortsideCrossing,
    StarboardCrossing,
}

impl Situation {
    /// Numeric code used in observation blocks
    pub fn code(&self) -> u8 {
        match self {
            Situation::None => 0,
            Situation::HeadOn => 1,
            Situation::Overtaking => 3,
            Situation::PortsideCrossing => 4,
            Situation::StarboardCrossing => 5,
        }
    }

    /// Situations in which the own entity has to keep clear by turning to starboard
    pub fn requires_give_way(&self) -> bool {
        matches!(self, Situation::HeadOn | Situation::StarboardCrossing)
    }
}

/// Classify the encounter between `own` and `other`.
///
/// The classification is instantaneous and uses no memory of earlier ticks. Entities
/// beyond `sight` are always [`Situation::None`].
pub fn classify_situation(own: &EntityState, other: &EntityState, sight: f64) -> Situation {
    if own.position.distance_to(&other.position) > sight {
        return Situation::None;
    }

    let bng_own = bearing_rel(&own.position, &other.position, own.heading);
    let bng_other = bearing_rel(&other.position, &own.position, other.heading);

    let (vx, vy) = project_vector(own.speed, own.course, other.speed, other.course);
    let v_rel = (vx * vx + vy * vy).sqrt();

    let bng_own_deg = rtd(bng_own);
    let bng_own_pi_deg = rtd(angle_to_pi(bng_own));
    let bng_other_deg = rtd(bng_other);
    let bng_other_pi_deg = rtd(angle_to_pi(bng_other));

    if bng_own_pi_deg.abs() <= 22.5 && bng_other_pi_deg.abs() <= 22.5 {
        return Situation::HeadOn;
    }

    if (112.5..=247.5).contains(&bng_other_deg)
        && bng_own_pi_deg.abs() <= 45.0
        && v_rel > other.speed
    {
        return Situation::Overtaking;
    }

    if (0.0..=112.5).contains(&bng_other_deg) && (-112.5..=10.0).contains(&bng_own_pi_deg) {
        return Situation::PortsideCrossing;
    }

    if (0.0..=112.5).contains(&bng_own_deg) && (-112.5..=10.0).contains(&bng_other_pi_deg) {
        return Situation::StarboardCrossing;
    }

    Situation::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{dtr, Position};
    use std::f64::consts::PI;

    const SIGHT: f64 = 1000.0;

    fn state(north: f64, east: f64, heading: f64, speed: f64) -> EntityState {
        EntityState {
            position: Position::new(north, east),
            heading,
            course: heading,
            speed,
        }
    }

    #[test]
    fn test_head_on() {
        let own = state(0.0, 0.0, 0.0, 1.0);
        let other = state(20.0, 0.0, PI, 1.0);

        let situation = classify_situation(&own, &other, SIGHT);
        assert_eq!(situation, Situation::HeadOn);
        assert_eq!(situation.code(), 1);
        assert!(situation.requires_give_way());
    }

    #[test]
    fn test_out_of_sight_is_none() {
        let own = state(0.0, 0.0, 0.0, 1.0);
        let other = state(20.0, 0.0, PI, 1.0);
        assert_eq!(classify_situation(&own, &other, 10.0), Situation::None);
    }

    #[test]
    fn test_overtaking_slower_vessel_ahead() {
        let own = state(0.0, 0.0, 0.0, 2.0);
        let other = state(100.0, 0.0, 0.0, 1.0);
        assert_eq!(classify_situation(&own, &other, SIGHT), Situation::Overtaking);
    }

    #[test]
    fn test_faster_vessel_ahead_is_no_conflict() {
        let own = state(0.0, 0.0, 0.0, 1.0);
        let other = state(100.0, 0.0, 0.0, 2.0);
        assert_eq!(classify_situation(&own, &other, SIGHT), Situation::None);
    }

    #[test]
    fn test_crossing_sides() {
        let own = state(0.0, 0.0, 0.0, 1.0);

        // other on the starboard bow heading west
        let starboard = state(100.0, 100.0, dtr(270.0), 1.0);
        let situation = classify_situation(&own, &starboard, SIGHT);
        assert_eq!(situation, Situation::StarboardCrossing);
        assert_eq!(situation.code(), 5);

        // other on the port bow heading east
        let port = state(100.0, -100.0, dtr(90.0), 1.0);
        let situation = classify_situation(&own, &port, SIGHT);
        assert_eq!(situation, Situation::PortsideCrossing);
        assert!(!situation.requires_give_way());
    }
}
