use serde::{Deserialize, Serialize};

use crate::entity::EntityState;
use crate::geometry::{bearing_rel_pi, cpa, dtr};

/// Parameters of the collision-risk metric
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Separation (m) at or below which risk is terminal
    pub min_safe_distance: f64,
    /// Distance (m) at which the CPA-based risk decays to `risk_floor`
    pub reference_distance: f64,
    /// Risk value reached at `reference_distance`, in `(0, 1)`
    pub risk_floor: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            min_safe_distance: 30.0,
            reference_distance: 75.0,
            risk_floor: 0.1,
        }
    }
}

/// Half-width of the forward cone in which the other entity sees the own entity at CPA
const FORWARD_CONE: f64 = 30.0;

/// Weight of a positive TCPA
const TCPA_WEIGHT_APPROACHING: f64 = 1.5;

/// Weight of a negative TCPA
const TCPA_WEIGHT_RECEDING: f64 = 20.0;

/// Collision risk of `other` seen from `own`, always in `[0, 1]`.
///
/// Combines a CPA-based term and a separation-based term; returns exactly `1.0` when the
/// separation is at or below the minimum safe distance.
pub fn collision_risk(own: &EntityState, other: &EntityState, params: &RiskParams) -> f64 {
    let separation = own.position.distance_to(&other.position);
    if separation <= params.min_safe_distance {
        return 1.0;
    }

    let measures = cpa(&own.track(), &other.track());
    let mut dcpa = (measures.dcpa - params.min_safe_distance).max(0.0);

    // is the own entity ahead of the other one when the CPA is reached?
    let cone = dtr(FORWARD_CONE);
    let bearing_at_cpa =
        bearing_rel_pi(&measures.other_at_cpa, &measures.own_at_cpa, other.heading).abs();

    if measures.tcpa >= 0.0 && bearing_at_cpa <= cone {
        // 0.2 dead ahead, exactly 1.0 at the cone edge
        dcpa *= 1.2 - (-(5.0f64.ln()) / cone * bearing_at_cpa).exp();
    }

    let weighted = if measures.tcpa >= 0.0 {
        dcpa + TCPA_WEIGHT_APPROACHING * measures.tcpa
    } else {
        dcpa + TCPA_WEIGHT_RECEDING * measures.tcpa.abs()
    };
    let cr_cpa = (weighted * params.risk_floor.ln() / params.reference_distance).exp();

    let cr_distance =
        (-(separation - params.min_safe_distance) / (params.reference_distance * 0.3)).exp();

    cr_cpa.max(cr_distance).min(1.0)
}
