use std::f64::consts::PI;

use ndarray::{arr1, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{EncoderConfig, MaritimeConfig, RewardWeights, TargetCount, UamConfig};
use crate::entity::{Aircraft, EntityState, HeadingCommand, Kinematics, Vessel};
use crate::env::MaritimeEnv;
use crate::error::ColavError;
use crate::geometry::{angle_to_2pi, angle_to_pi, cpa, Position};
use crate::history::{mask_empty, HistoryBuffer};
use crate::layers::RecurrentKind;
use crate::network::{HistoryEncoder, QuantileCritics};
use crate::observation::{collision_risk, RiskParams};

#[test]
fn test_angles_at_wrap_boundaries() {
    assert_eq!(angle_to_2pi(2.0 * PI), 0.0);
    assert!((angle_to_2pi(-0.5 * PI) - 1.5 * PI).abs() < 1e-12);
    assert!((angle_to_pi(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
    assert!(angle_to_pi(PI).abs() <= PI);
}

#[test]
fn test_coincident_entities_have_full_risk() {
    let state = EntityState {
        position: Position::new(10.0, 10.0),
        heading: 0.0,
        course: 0.0,
        speed: 1.0,
    };
    assert_eq!(collision_risk(&state, &state, &RiskParams::default()), 1.0);

    let measures = cpa(&state.track(), &state.track());
    assert_eq!(measures.dcpa, 0.0);
    assert!(measures.tcpa.is_finite());
}

#[test]
fn test_stationary_vessel_stays_put() {
    let mut vessel = Vessel::new(Position::new(5.0, 5.0), 0.3, 0.0, 3.0);
    vessel.advance(HeadingCommand::Starboard);

    assert_eq!(vessel.position(), Position::new(5.0, 5.0));
    assert!(vessel.heading() > 0.3);
}

#[test]
fn test_aircraft_ignores_infinite_command() {
    let mut aircraft = Aircraft::new(Position::default(), 0.0, 15.0, 1.0);
    aircraft.advance(f64::INFINITY);
    assert!(aircraft.heading().is_finite());
    assert!(aircraft.position().north.is_finite());
}

#[test]
fn test_history_capacity_one() {
    let mut history = HistoryBuffer::new(1);
    history.push(1);
    history.push(2);

    assert_eq!(history.to_vec(), vec![2]);
    assert_eq!(history.last(), Some(&2));
}

#[test]
fn test_mask_empty_checks_row_count() {
    let mut rows = Array2::ones((2, 3));
    assert!(mask_empty(&mut rows, &[0]).is_err());
}

#[test]
fn test_history_encoder_without_history() {
    let encoder = HistoryEncoder::new(3, 4, RecurrentKind::Gru, &mut StdRng::seed_from_u64(0));
    let state = arr1(&[0.1, 0.2, 0.3]);

    let empty = encoder.forward(state.view(), Array2::zeros((2, 3)).view(), 0).unwrap();
    let noise = encoder.forward(state.view(), Array2::ones((2, 3)).view(), 0).unwrap();
    assert_eq!(empty, noise);
}

#[test]
fn test_quantile_critics_shape() {
    let critics = QuantileCritics::new(4, 2, 5, 3, &[8, 8], &mut StdRng::seed_from_u64(0)).unwrap();
    let values = critics
        .forward(Array1::zeros(4).view(), arr1(&[0.5, -0.5]).view())
        .unwrap();

    assert_eq!(values.dim(), (3, 5));
    assert!(critics.forward(Array1::zeros(3).view(), arr1(&[0.5, -0.5]).view()).is_err());
}

#[test]
fn test_encoder_config_rejects_zero_hidden_size() {
    let config = EncoderConfig {
        outer_hidden: 0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ColavError::InvalidParameter { .. })));
}

#[test]
fn test_maritime_config_rejects_bad_values() {
    let silent = MaritimeConfig {
        weights: RewardWeights {
            distance: 0.0,
            heading: 0.0,
            collision: 0.0,
            colreg: 0.0,
            comfort: 0.0,
        },
        ..Default::default()
    };
    assert!(silent.validate().is_err());

    let too_few = MaritimeConfig {
        max_targets: 2,
        target_count: TargetCount::Random,
        ..Default::default()
    };
    assert!(too_few.validate().is_err());

    let increasing = MaritimeConfig {
        target_count: TargetCount::Increasing,
        ..Default::default()
    };
    assert!(matches!(increasing.validate(), Err(ColavError::NotImplemented(_))));
}

#[test]
fn test_uam_config_bounds() {
    let crowded = UamConfig {
        max_agents: 62,
        ..Default::default()
    };
    assert!(crowded.validate().is_err());

    let no_priority = UamConfig {
        max_agents: 62,
        priority: false,
        ..Default::default()
    };
    assert!(no_priority.validate().is_ok());

    let alone = UamConfig {
        max_agents: 1,
        ..Default::default()
    };
    assert!(alone.validate().is_err());
}

#[test]
fn test_maritime_without_targets_uses_placeholder() {
    let config = MaritimeConfig {
        target_count: TargetCount::Fixed(0),
        seed: Some(1),
        ..Default::default()
    };
    let env = MaritimeEnv::new(config).unwrap();

    assert!(env.targets().is_empty());
    assert_eq!(env.observation().cardinality(), 1);
}

#[test]
fn test_reset_with_too_many_targets() {
    let mut env = MaritimeEnv::new(MaritimeConfig {
        max_targets: 3,
        seed: Some(2),
        ..Default::default()
    })
    .unwrap();
    let targets = (0..4)
        .map(|i| Vessel::new(Position::new(100.0 * i as f64, 0.0), 0.0, 1.0, 3.0))
        .collect();

    assert!(matches!(
        env.reset_with(
            Vessel::new(Position::default(), 0.0, 1.2, 3.0),
            Position::new(400.0, 0.0),
            targets,
        ),
        Err(ColavError::InvalidParameter { .. })
    ));
}
