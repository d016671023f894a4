//! # Geometry and Navigation Utilities
//!
//! Pure functions over a local north/east frame. Angles are in radians, measured clockwise
//! from north, so a heading of `0.0` points north and `PI / 2` points east. Cartesian helpers
//! use `x = east` and `y = north`.
//!
//! Degenerate inputs never produce NaN:
//!
//! - the bearing of a zero vector is `0.0`
//! - projecting onto a zero vector yields the zero vector
//! - two tracks without relative motion have `TCPA = 0`, so `DCPA` is the current separation

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Length of one nautical mile in meters
pub const NM_IN_METERS: f64 = 1852.0;

/// A point in the local north/east frame (meters)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub north: f64,
    pub east: f64,
}

impl Position {
    pub fn new(north: f64, east: f64) -> Self {
        Position { north, east }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Position) -> f64 {
        euclidean_distance(self, other)
    }

    /// Point reached after moving `distance` along `course`
    pub fn advanced(&self, course: f64, distance: f64) -> Position {
        let (dx, dy) = xy_from_polar(distance, course);
        Position {
            north: self.north + dy,
            east: self.east + dx,
        }
    }
}

/// Constant-velocity motion of a point, the input to all CPA computations
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Track {
    pub position: Position,
    pub course: f64,
    pub speed: f64,
}

/// Closest point of approach between two tracks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cpa {
    /// Distance at the closest point of approach
    pub dcpa: f64,
    /// Time until the closest point of approach, negative once it has passed
    pub tcpa: f64,
    /// Position of the own track at the CPA instant
    pub own_at_cpa: Position,
    /// Position of the other track at the CPA instant
    pub other_at_cpa: Position,
}

/// Degrees to radians
#[inline]
pub fn dtr(angle: f64) -> f64 {
    angle / 180.0 * PI
}

/// Radians to degrees
#[inline]
pub fn rtd(angle: f64) -> f64 {
    angle / PI * 180.0
}

pub fn nm_to_meter(nm: f64) -> f64 {
    nm * NM_IN_METERS
}

pub fn meter_to_nm(meter: f64) -> f64 {
    meter / NM_IN_METERS
}

/// Shifts an angle into `[0, 2π)`
pub fn angle_to_2pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}

/// Shifts an angle into `(-π, π]`
pub fn angle_to_pi(angle: f64) -> f64 {
    let wrapped = angle_to_2pi(angle);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

pub fn euclidean_distance(a: &Position, b: &Position) -> f64 {
    ((a.north - b.north).powi(2) + (a.east - b.east).powi(2)).sqrt()
}

/// Polar coordinates `(r, angle)` of the cartesian point `(x, y)`, angle in `[0, 2π)`
pub fn polar_from_xy(x: f64, y: f64) -> (f64, f64) {
    let r = (x * x + y * y).sqrt();
    (r, angle_to_2pi(x.atan2(y)))
}

/// Cartesian point `(x, y)` of the polar coordinates `(r, angle)`
pub fn xy_from_polar(r: f64, angle: f64) -> (f64, f64) {
    (r * angle.sin(), r * angle.cos())
}

/// Absolute bearing from `from` to `to`, in `[0, 2π)`
pub fn bearing_abs(from: &Position, to: &Position) -> f64 {
    polar_from_xy(to.east - from.east, to.north - from.north).1
}

/// Bearing from `from` to `to` relative to `heading`, in `[0, 2π)`
pub fn bearing_rel(from: &Position, to: &Position, heading: f64) -> f64 {
    angle_to_2pi(bearing_abs(from, to) - heading)
}

/// Relative bearing mapped to `(-π, π]`; negative values are on the port side
pub fn bearing_rel_pi(from: &Position, to: &Position, heading: f64) -> f64 {
    angle_to_pi(bearing_abs(from, to) - heading)
}

/// Heading intersection angle of the other heading seen from the own heading, in `[0, 2π)`
pub fn heading_intersection(own_heading: f64, other_heading: f64) -> f64 {
    angle_to_2pi(other_heading - own_heading)
}

/// Heading intersection angle in `(-π, π]`
pub fn heading_intersection_pi(own_heading: f64, other_heading: f64) -> f64 {
    angle_to_pi(other_heading - own_heading)
}

/// Projects vector A onto vector B, both given in polar form, returning the cartesian result
pub fn project_vector(va: f64, angle_a: f64, vb: f64, angle_b: f64) -> (f64, f64) {
    let (xa, ya) = xy_from_polar(va, angle_a);
    let (xb, yb) = xy_from_polar(vb, angle_b);

    let norm_sq = xb * xb + yb * yb;
    if norm_sq == 0.0 {
        return (0.0, 0.0);
    }

    let scale = (xa * xb + ya * yb) / norm_sq;
    (scale * xb, scale * yb)
}

/// Time to the closest point of approach of two constant-velocity tracks
pub fn tcpa(own: &Track, other: &Track) -> f64 {
    let (vx_own, vy_own) = xy_from_polar(own.speed, own.course);
    let (vx_other, vy_other) = xy_from_polar(other.speed, other.course);

    let vrx = vx_other - vx_own;
    let vry = vy_other - vy_own;
    let den = vrx * vrx + vry * vry;
    if den == 0.0 {
        return 0.0;
    }

    let dx = other.position.east - own.position.east;
    let dy = other.position.north - own.position.north;
    -(dx * vrx + dy * vry) / den
}

/// Closest point of approach of two constant-velocity tracks
pub fn cpa(own: &Track, other: &Track) -> Cpa {
    let t = tcpa(own, other);
    let own_at_cpa = own.position.advanced(own.course, own.speed * t);
    let other_at_cpa = other.position.advanced(other.course, other.speed * t);

    Cpa {
        dcpa: euclidean_distance(&own_at_cpa, &other_at_cpa),
        tcpa: t,
        own_at_cpa,
        other_at_cpa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_angle_wrapping() {
        assert!((angle_to_2pi(-PI / 2.0) - 1.5 * PI).abs() < EPS);
        assert!((angle_to_2pi(5.0 * PI) - PI).abs() < EPS);
        assert!((angle_to_pi(1.5 * PI) + 0.5 * PI).abs() < EPS);
        assert!((angle_to_pi(PI) - PI).abs() < EPS);
        assert_eq!(angle_to_2pi(-1e-20), 0.0);
    }

    #[test]
    fn test_bearings() {
        let origin = Position::new(0.0, 0.0);
        let east = Position::new(0.0, 10.0);
        let south = Position::new(-10.0, 0.0);

        assert!((bearing_abs(&origin, &east) - PI / 2.0).abs() < EPS);
        assert!((bearing_abs(&origin, &south) - PI).abs() < EPS);
        assert!((bearing_rel(&origin, &east, PI) - 1.5 * PI).abs() < EPS);
        assert!((bearing_rel_pi(&origin, &east, PI) + 0.5 * PI).abs() < EPS);
        assert_eq!(bearing_abs(&origin, &origin), 0.0);
    }

    #[test]
    fn test_project_vector_onto_zero_is_zero() {
        assert_eq!(project_vector(3.0, 0.4, 0.0, 1.0), (0.0, 0.0));

        let (x, y) = project_vector(2.0, 0.0, 1.0, PI / 2.0);
        assert!(x.abs() < EPS && y.abs() < EPS);

        let (x, y) = project_vector(2.0, 0.0, 5.0, 0.0);
        assert!(x.abs() < EPS && (y - 2.0).abs() < EPS);
    }

    #[test]
    fn test_cpa_head_on() {
        let own = Track { position: Position::new(0.0, 0.0), course: 0.0, speed: 1.0 };
        let other = Track { position: Position::new(20.0, 0.0), course: PI, speed: 1.0 };

        let result = cpa(&own, &other);
        assert!((result.tcpa - 10.0).abs() < EPS);
        assert!(result.dcpa < 1e-6);
        assert!((result.own_at_cpa.north - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_cpa_without_relative_motion() {
        let own = Track { position: Position::new(0.0, 0.0), course: 0.3, speed: 2.0 };
        let other = Track { position: Position::new(30.0, 40.0), course: 0.3, speed: 2.0 };

        let result = cpa(&own, &other);
        assert_eq!(result.tcpa, 0.0);
        assert!((result.dcpa - 50.0).abs() < EPS);
    }

    #[test]
    fn test_receding_tracks_have_negative_tcpa() {
        let own = Track { position: Position::new(0.0, 0.0), course: PI, speed: 1.0 };
        let other = Track { position: Position::new(20.0, 0.0), course: 0.0, speed: 1.0 };
        assert!(tcpa(&own, &other) < 0.0);
    }
}
