//! Own ship steering towards a goal through crossing target ships.
//!
//! The own ship starts so that it would pass the world center after a critical time and
//! has to reach a goal on the far side. Target ships are spawned on trajectories that cut
//! the own ship's line to the goal in a sampled right-of-way situation.

use std::f64::consts::PI;

use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use super::{check_policy_history, Environment, Frame, RewardBreakdown, TickSnapshot, Transition};
use crate::config::{EncoderConfig, MaritimeConfig, TargetCount};
use crate::entity::{EntityState, HeadingCommand, Kinematics, Vessel};
use crate::error::{ColavError, Result};
use crate::geometry::{
    angle_to_2pi, bearing_abs, bearing_rel_pi, dtr, project_vector, tcpa, Position,
};
use crate::history::HistoryBuffer;
use crate::network::Policy;
use crate::observation::{
    classify_situation, collision_risk, MaritimeEncoder, Observation, Situation,
};

/// Situation sampled when a target ship is spawned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpawnSituation {
    /// Target comes from behind without overtaking constraints
    Null,
    HeadOn,
    StarboardCrossing,
    PortsideCrossing,
    Overtaking,
}

impl SpawnSituation {
    fn from_index(index: usize) -> Self {
        match index {
            0 => SpawnSituation::Null,
            1 => SpawnSituation::HeadOn,
            2 => SpawnSituation::StarboardCrossing,
            3 => SpawnSituation::PortsideCrossing,
            _ => SpawnSituation::Overtaking,
        }
    }

    /// Target heading relative to the bearing of the goal
    fn sample_intersection<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            SpawnSituation::Null | SpawnSituation::Overtaking => {
                angle_to_2pi(dtr(rng.gen_range(-67.5..67.5)))
            }
            SpawnSituation::HeadOn => dtr(rng.gen_range(175.0..185.0)),
            SpawnSituation::StarboardCrossing => dtr(rng.gen_range(185.0..292.5)),
            SpawnSituation::PortsideCrossing => dtr(rng.gen_range(67.5..175.0)),
        }
    }
}

pub struct MaritimeEnv {
    config: MaritimeConfig,
    encoder: MaritimeEncoder,
    rng: StdRng,

    own: Vessel,
    goal: Position,
    targets: Vec<Vessel>,
    /// Target `i` was (re)spawned during the last tick
    respawned: Vec<bool>,
    situations: Vec<Situation>,
    previous: TickSnapshot,

    goal_distance_old: f64,
    observation: Observation,
    history: HistoryBuffer<Observation>,
    step_count: usize,
    sim_time: f64,
    last_reward: f64,
}

impl MaritimeEnv {
    pub const DELTA_T: f64 = 3.0;
    /// Side length of the square world (m)
    pub const WORLD_SIZE: f64 = 500.0;
    pub const GOAL_REACH_DISTANCE: f64 = 50.0;
    pub const MAX_EPISODE_STEPS: usize = 300;
    pub const OWN_SPEED: f64 = 1.2;
    /// Time after which the own ship would pass the world center (s)
    pub const TCPA_CRIT: f64 = 180.0;
    /// Minimum distance between a spawning target and the targets already present (m)
    pub const MIN_SPAWN_DISTANCE: f64 = 50.0;
    /// Largest risk at which the situation still counts as safe
    pub const SAFE_RISK: f64 = 0.2;
    pub const MAX_SPAWN_ATTEMPTS: usize = 1000;

    const TARGET_COUNT_WEIGHTS: [f64; 4] = [0.1, 0.3, 0.3, 0.3];

    /// Build the environment and start its first episode
    pub fn new(config: MaritimeConfig) -> Result<Self> {
        config.validate()?;

        let encoder = MaritimeEncoder::new(config.state_design, config.max_targets);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let layout = encoder.layout();
        let history = HistoryBuffer::new(config.history_length);

        let mut env = MaritimeEnv {
            config,
            encoder,
            rng,
            own: Vessel::new(Position::default(), 0.0, Self::OWN_SPEED, Self::DELTA_T),
            goal: Position::default(),
            targets: Vec::new(),
            respawned: Vec::new(),
            situations: Vec::new(),
            previous: TickSnapshot::default(),
            goal_distance_old: 0.0,
            observation: Observation::zeros(layout),
            history,
            step_count: 0,
            sim_time: 0.0,
            last_reward: 0.0,
        };
        env.reset()?;
        Ok(env)
    }

    pub fn config(&self) -> &MaritimeConfig {
        &self.config
    }

    /// Encoder sizes matching this environment's observation layout and history length
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::for_layout(self.encoder.layout(), self.config.history_length)
    }

    pub fn encoder(&self) -> &MaritimeEncoder {
        &self.encoder
    }

    pub fn own(&self) -> EntityState {
        self.own.snapshot()
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn targets(&self) -> &[Vessel] {
        &self.targets
    }

    pub fn situations(&self) -> &[Situation] {
        &self.situations
    }

    pub fn previous_tick(&self) -> &TickSnapshot {
        &self.previous
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    /// Observations of the own ship before the current one, oldest first
    pub fn history(&self) -> &HistoryBuffer<Observation> {
        &self.history
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Start an episode from a given scene instead of a sampled one
    pub fn reset_with(
        &mut self,
        own: Vessel,
        goal: Position,
        targets: Vec<Vessel>,
    ) -> Result<Observation> {
        if targets.len() > self.config.max_targets {
            return Err(ColavError::invalid_parameter(
                "targets",
                format!(
                    "{} targets exceed max_targets = {}",
                    targets.len(),
                    self.config.max_targets
                ),
            ));
        }
        self.step_count = 0;
        self.sim_time = 0.0;
        self.last_reward = 0.0;

        self.goal_distance_old = own.position.distance_to(&goal);
        self.own = own;
        self.goal = goal;
        self.respawned = vec![true; targets.len()];
        self.situations = vec![Situation::None; targets.len()];
        self.targets = targets;

        self.previous = self.snapshot();
        self.update_situations();

        self.history.reset();
        self.observation = self.encode()?;
        Ok(self.observation.clone())
    }

    /// Ask `policy` for an action on the current observation and apply it
    pub fn step_with_policy<P>(&mut self, policy: &P) -> Result<Transition>
    where
        P: Policy<Action = usize>,
    {
        check_policy_history(policy.history_length(), self.history.capacity())?;
        let action = policy.select_action(&self.observation, &self.history)?;
        self.step(action)
    }

    fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            step: self.step_count,
            situations: self.situations.clone(),
        }
    }

    fn target_states(&self) -> Vec<EntityState> {
        self.targets.iter().map(|t| t.snapshot()).collect()
    }

    fn update_situations(&mut self) {
        let own = self.own.snapshot();
        self.situations = self
            .targets
            .iter()
            .map(|t| classify_situation(&own, &t.snapshot(), self.encoder.sight))
            .collect();
    }

    fn encode(&self) -> Result<Observation> {
        self.encoder
            .encode(&self.own.snapshot(), &self.goal, &self.target_states(), &self.situations)
    }

    fn sample_target_count(&mut self) -> Result<usize> {
        match self.config.target_count {
            TargetCount::Random => {
                let dist = WeightedIndex::new(Self::TARGET_COUNT_WEIGHTS)
                    .map_err(|e| ColavError::Numerical(e.to_string()))?;
                Ok(self.rng.sample(dist))
            }
            TargetCount::Fixed(n) => Ok(n),
            TargetCount::Increasing => Err(ColavError::not_implemented("increasing target counts")),
        }
    }

    /// Place a target ship on a trajectory that crosses the own ship's line to the goal.
    ///
    /// The target at index `replacing`, if any, is ignored by the spacing check.
    fn spawn_target(&mut self, replacing: Option<usize>) -> Vessel {
        let own = self.own.snapshot();
        let bng_goal = bearing_abs(&own.position, &self.goal);
        let (vx_goal, vy_goal) = project_vector(own.speed, own.course, 1.0, bng_goal);

        let mut candidate = Vessel::new(own.position, 0.0, own.speed, Self::DELTA_T);
        for _ in 0..Self::MAX_SPAWN_ATTEMPTS {
            let mut speed = own.speed * self.rng.gen_range(0.9..1.1);
            let situation = SpawnSituation::from_index(self.rng.gen_range(0..5));

            let t_hit = self.rng.gen_range(0.75 * Self::TCPA_CRIT..Self::TCPA_CRIT);
            let hit = Position::new(
                own.position.north + vy_goal * t_hit,
                own.position.east + vx_goal * t_hit,
            );

            let heading = angle_to_2pi(situation.sample_intersection(&mut self.rng) + bng_goal);
            if situation == SpawnSituation::Overtaking {
                let (x, y) = project_vector(own.speed, own.course, 1.0, heading);
                speed = self.rng.gen_range(0.3..0.7) * x.hypot(y);
            }

            let origin = hit.advanced(heading, -speed * t_hit);
            candidate = Vessel::new(origin, heading, speed, Self::DELTA_T);

            let spaced = self
                .targets
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != replacing)
                .all(|(_, t)| t.position.distance_to(&origin) >= Self::MIN_SPAWN_DISTANCE);
            if spaced {
                return candidate;
            }
        }

        warn!(
            "no target spawn {} m clear of the others after {} attempts, keeping the last one",
            Self::MIN_SPAWN_DISTANCE,
            Self::MAX_SPAWN_ATTEMPTS
        );
        candidate
    }

    fn handle_respawn(&mut self) {
        let radius = match self.config.respawn_radius {
            Some(radius) => radius,
            None => {
                self.respawned.iter_mut().for_each(|flag| *flag = false);
                return;
            }
        };

        for i in 0..self.targets.len() {
            let distance = self.own.position.distance_to(&self.targets[i].position);
            self.respawned[i] = distance > radius;
            if self.respawned[i] {
                debug!("respawning target {} at {:.1} m from the own ship", i, distance);
                let target = self.spawn_target(Some(i));
                self.targets[i] = target;
            }
        }
    }

    fn calculate_reward(&mut self, command: HeadingCommand) -> RewardBreakdown {
        let own = self.own.snapshot();
        let risks: Vec<f64> = self
            .targets
            .iter()
            .map(|t| collision_risk(&own, &t.snapshot(), &self.encoder.risk))
            .collect();
        let safe = risks.iter().all(|&risk| risk <= Self::SAFE_RISK);

        let goal_distance = own.position.distance_to(&self.goal);
        let r_dist = (self.goal_distance_old - goal_distance) / 0.4 - 1.0;
        self.goal_distance_old = goal_distance;

        let r_head = -bearing_rel_pi(&own.position, &self.goal, own.heading).abs() / PI;

        let mut r_coll = 0.0;
        let mut r_colreg = 0.0;
        for (i, (target, &risk)) in self.targets.iter().zip(&risks).enumerate() {
            if risk == 1.0 {
                r_coll -= 10.0;
            } else if self.config.nonlinear_collision {
                r_coll -= risk.sqrt();
            } else {
                r_coll -= risk;
            }

            // freshly spawned targets are not judged
            if self.respawned[i] {
                continue;
            }
            let target = target.snapshot();
            let approaching = tcpa(&own.track(), &target.track()) >= 0.0;
            let in_sight = own.position.distance_to(&target.position) <= self.encoder.sight;
            if in_sight
                && approaching
                && self.previous.situation(i).requires_give_way()
                && command == HeadingCommand::Port
            {
                r_colreg -= 1.0;
            }
        }

        let r_comf = if !command.is_turn() || (self.config.adaptive_comfort && !safe) {
            0.0
        } else {
            -1.0
        };

        let w = &self.config.weights;
        let w_sum = w.sum();
        RewardBreakdown {
            distance: r_dist * w.distance / w_sum,
            heading: r_head * w.heading / w_sum,
            collision: r_coll * w.collision / w_sum,
            colreg: r_colreg * w.colreg / w_sum,
            comfort: r_comf * w.comfort / w_sum,
            goal: 0.0,
        }
    }

    fn is_done(&self) -> bool {
        let goal_reached = self.own.position.distance_to(&self.goal) <= Self::GOAL_REACH_DISTANCE;
        goal_reached || self.step_count >= Self::MAX_EPISODE_STEPS
    }
}

impl Environment for MaritimeEnv {
    type Action = usize;

    fn reset(&mut self) -> Result<Observation> {
        let situation = self.rng.gen_range(0..4usize);
        let heading = situation as f64 * PI / 2.0;
        let center = Position::new(Self::WORLD_SIZE / 2.0, Self::WORLD_SIZE / 2.0);

        // reaches the center after TCPA_CRIT when keeping its initial heading
        let start = center.advanced(heading, -Self::OWN_SPEED * Self::TCPA_CRIT);
        let goal = match situation {
            0 => Position::new(center.north + (center.north - start.north).abs(), start.east),
            1 => Position::new(start.north, center.east + (center.east - start.east).abs()),
            2 => Position::new(center.north - (center.north - start.north).abs(), start.east),
            _ => Position::new(start.north, center.east - (center.east - start.east).abs()),
        };

        let heading = heading + dtr(self.rng.gen_range(-5.0..5.0));
        self.own = Vessel::new(start, heading, Self::OWN_SPEED, Self::DELTA_T);
        self.goal = goal;

        let n_targets = self.sample_target_count()?;
        self.targets.clear();
        for _ in 0..n_targets {
            let target = self.spawn_target(None);
            self.targets.push(target);
        }

        debug!(
            "maritime reset: initial situation {}, {} targets, goal at N {:.1} / E {:.1}",
            situation, n_targets, goal.north, goal.east
        );

        let own = self.own.clone();
        let targets = std::mem::take(&mut self.targets);
        self.reset_with(own, goal, targets)
    }

    fn step(&mut self, action: usize) -> Result<Transition> {
        let command = HeadingCommand::from_index(action)?;

        self.previous = self.snapshot();
        self.history.push(self.observation.clone());

        self.own.advance(command);
        for target in &mut self.targets {
            target.advance(HeadingCommand::Keep);
        }
        self.handle_respawn();
        self.update_situations();

        self.step_count += 1;
        self.sim_time += Self::DELTA_T;

        self.observation = self.encode()?;
        let breakdown = self.calculate_reward(command);
        let reward = breakdown.total();
        let done = self.is_done();
        self.last_reward = reward;

        trace!(
            "step {}: action {:?}, reward {:.4}, goal distance {:.1} m",
            self.step_count,
            command,
            reward,
            self.goal_distance_old
        );
        if done {
            debug!("maritime episode finished after {} steps", self.step_count);
        }

        Ok(Transition {
            observation: self.observation.clone(),
            reward,
            done,
            breakdown,
        })
    }

    fn frame(&self) -> Frame {
        Frame {
            step: self.step_count,
            sim_time: self.sim_time,
            own: self.own.snapshot(),
            others: self.target_states(),
            goal: self.goal,
            reward: self.last_reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnMode;

    fn config(targets: usize) -> MaritimeConfig {
        MaritimeConfig {
            target_count: TargetCount::Fixed(targets),
            seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_reset_places_own_ship_towards_center() {
        let env = MaritimeEnv::new(config(2)).unwrap();
        let own = env.own();
        let center = Position::new(250.0, 250.0);

        let distance = own.position.distance_to(&center);
        assert!((distance - MaritimeEnv::OWN_SPEED * MaritimeEnv::TCPA_CRIT).abs() < 1e-6);
        assert!((env.goal().distance_to(&center) - distance).abs() < 1e-6);
        assert_eq!(env.targets().len(), 2);
        assert_eq!(env.observation().to_padded().len(), 4 + 3 * 6);
    }

    #[test]
    fn test_targets_respect_spawn_spacing() {
        let env = MaritimeEnv::new(config(3)).unwrap();
        let targets = env.targets();
        for i in 0..targets.len() {
            for j in 0..i {
                let d = targets[i].position.distance_to(&targets[j].position);
                assert!(d >= MaritimeEnv::MIN_SPAWN_DISTANCE);
            }
        }
    }

    #[test]
    fn test_port_turn_in_head_on_is_penalized() {
        let mut env = MaritimeEnv::new(config(1)).unwrap();
        let own = Vessel::new(Position::new(0.0, 0.0), 0.0, 1.2, MaritimeEnv::DELTA_T);
        let target = Vessel::new(Position::new(400.0, 0.0), PI, 1.2, MaritimeEnv::DELTA_T);
        env.reset_with(own, Position::new(1000.0, 0.0), vec![target]).unwrap();

        let first = env.step(2).unwrap();
        assert!(first.breakdown.colreg < 0.0);
        assert!(first.breakdown.comfort < 0.0);

        let second = env.step(1).unwrap();
        assert_eq!(second.breakdown.colreg, 0.0);
        assert_eq!(env.previous_tick().situation(0), Situation::HeadOn);
    }

    #[test]
    fn test_episode_ends_at_step_limit() {
        let mut env = MaritimeEnv::new(config(0)).unwrap();
        let own = Vessel::new(Position::new(0.0, 0.0), 0.0, 0.0, MaritimeEnv::DELTA_T);
        env.reset_with(own, Position::new(400.0, 0.0), Vec::new()).unwrap();

        let mut steps = 0;
        loop {
            steps += 1;
            if env.step(0).unwrap().done {
                break;
            }
        }
        assert_eq!(steps, MaritimeEnv::MAX_EPISODE_STEPS);
        assert_eq!(env.history().len(), 2);
    }

    #[test]
    fn test_unfinished_spawn_mode_fails_at_construction() {
        let config = MaritimeConfig {
            spawn_mode: SpawnMode::LineV2,
            ..Default::default()
        };
        assert!(matches!(MaritimeEnv::new(config), Err(ColavError::NotImplemented(_))));
    }
}
