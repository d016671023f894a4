//! Air taxis sharing a single vertiport.
//!
//! Aircraft spawn on a circle around the vertiport and fly towards it. The vertiport closes
//! for a fixed period after every entry, so the fleet has to take turns while keeping its
//! separation.

use std::f64::consts::PI;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::{check_policy_history, Environment, Frame, RewardBreakdown, Transition};
use crate::config::{EncoderConfig, UamConfig};
use crate::entity::{Aircraft, EntityState, Kinematics};
use crate::error::{ColavError, Result};
use crate::geometry::Position;
use crate::history::HistoryBuffer;
use crate::network::Policy;
use crate::observation::{Observation, UamEncoder, VertiportTiming};

/// Vertiport with its opening schedule
#[derive(Clone, Debug, PartialEq)]
pub struct Destination {
    pub position: Position,
    /// Entering within this radius counts as an entry (m)
    pub radius: f64,
    /// Aircraft spawn at most this far away (m)
    pub spawn_radius: f64,
    /// Aircraft beyond this distance are respawned (m)
    pub respawn_radius: f64,
    delta_t: f64,
    t_close: f64,
    t_next_open: f64,
    t_open_since: f64,
    is_open: bool,
    was_open: bool,
}

impl Destination {
    pub fn new(position: Position, delta_t: f64) -> Self {
        Destination {
            position,
            radius: 100.0,
            spawn_radius: 1100.0,
            respawn_radius: 1300.0,
            delta_t,
            t_close: 60.0,
            t_next_open: 0.0,
            t_open_since: 0.0,
            is_open: true,
            was_open: true,
        }
    }

    pub fn reset(&mut self) {
        self.open();
        self.was_open = true;
    }

    /// Advance the schedule by one tick and register entries.
    ///
    /// `distances[i]` is the distance of aircraft `i` to the vertiport. Returns who entered
    /// while it was closed and who entered while it was open. The vertiport closes as soon
    /// as anyone entered it open.
    pub fn step(&mut self, distances: &[f64]) -> (Vec<bool>, Vec<bool>) {
        if self.is_open {
            self.t_open_since += self.delta_t;
        } else {
            self.t_next_open -= self.delta_t;
            if self.t_next_open <= 0.0 {
                self.open();
            }
        }
        self.was_open = self.is_open;

        let inside: Vec<bool> = distances.iter().map(|&d| d <= self.radius).collect();
        let entered_open: Vec<bool> = inside.iter().map(|&inside| inside && self.is_open).collect();
        let entered_closed: Vec<bool> =
            inside.iter().map(|&inside| inside && !self.is_open).collect();

        if entered_open.iter().any(|&entered| entered) {
            self.close();
        }
        (entered_closed, entered_open)
    }

    fn open(&mut self) {
        self.t_open_since = 0.0;
        self.t_next_open = 0.0;
        self.is_open = true;
    }

    fn close(&mut self) {
        self.t_open_since = 0.0;
        self.t_next_open = self.t_close;
        self.is_open = false;
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Opening status after the schedule update of the last tick, before any entry closed it
    pub fn was_open(&self) -> bool {
        self.was_open
    }

    pub fn t_close(&self) -> f64 {
        self.t_close
    }

    pub fn t_next_open(&self) -> f64 {
        self.t_next_open
    }

    pub fn t_open_since(&self) -> f64 {
        self.t_open_since
    }

    pub fn timing(&self) -> VertiportTiming {
        VertiportTiming {
            t_next_open: self.t_next_open,
            t_open_since: self.t_open_since,
            t_close: self.t_close,
        }
    }
}

/// One aircraft together with what it remembers
#[derive(Clone, Debug)]
struct Taxi {
    aircraft: Aircraft,
    history: HistoryBuffer<Observation>,
    goal_distance: f64,
    goal_distance_old: f64,
}

pub struct UamEnv {
    config: UamConfig,
    encoder: UamEncoder,
    rng: StdRng,
    destination: Destination,

    taxis: Vec<Taxi>,
    observations: Vec<Observation>,
    rewards: Vec<RewardBreakdown>,

    step_count: usize,
    sim_time: f64,
    accidents: usize,
    incidents: usize,
    closed_entries: usize,
}

impl UamEnv {
    pub const DELTA_T: f64 = 1.0;
    pub const MAX_EPISODE_STEPS: usize = 500;
    /// Mean true airspeed (m/s); actual speeds are spread by `SPEED_SPREAD`
    pub const CRUISE_SPEED: f64 = 15.0;
    pub const SPEED_SPREAD: f64 = 3.0;
    pub const INCIDENT_DISTANCE: f64 = 100.0;
    pub const ACCIDENT_DISTANCE: f64 = 10.0;
    /// Fleet sizes sampled in single-policy mode
    pub const FLEET_SIZES: [usize; 5] = [2, 4, 6, 8, 10];
    /// Initial lifetime of the first aircraft, so that it starts with the landing priority
    pub const LEADER_LIFETIME: u32 = 100;

    /// Build the environment and start its first episode
    pub fn new(config: UamConfig) -> Result<Self> {
        config.validate()?;

        let destination = Destination::new(Position::default(), Self::DELTA_T);
        let encoder =
            UamEncoder::new(config.max_agents, destination.spawn_radius, config.priority)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut env = UamEnv {
            config,
            encoder,
            rng,
            destination,
            taxis: Vec::new(),
            observations: Vec::new(),
            rewards: Vec::new(),
            step_count: 0,
            sim_time: 0.0,
            accidents: 0,
            incidents: 0,
            closed_entries: 0,
        };
        env.reset()?;
        Ok(env)
    }

    pub fn config(&self) -> &UamConfig {
        &self.config
    }

    /// Encoder sizes matching this environment's observation layout and history length
    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::for_layout(self.encoder.layout(), self.config.history_length)
    }

    pub fn encoder(&self) -> &UamEncoder {
        &self.encoder
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn fleet_size(&self) -> usize {
        self.taxis.len()
    }

    pub fn aircraft(&self, index: usize) -> Option<&Aircraft> {
        self.taxis.get(index).map(|t| &t.aircraft)
    }

    /// Current observation of every aircraft
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn history(&self, index: usize) -> Option<&HistoryBuffer<Observation>> {
        self.taxis.get(index).map(|t| &t.history)
    }

    /// Reward of every aircraft in the last tick
    pub fn rewards(&self) -> &[RewardBreakdown] {
        &self.rewards
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Pairs of aircraft that came within the accident distance, summed over the episode
    pub fn accidents(&self) -> usize {
        self.accidents
    }

    pub fn incidents(&self) -> usize {
        self.incidents
    }

    pub fn closed_entries(&self) -> usize {
        self.closed_entries
    }

    /// Steer every aircraft with one shared policy, each through its own history
    pub fn step_with_policy<P>(&mut self, policy: &P) -> Result<Transition>
    where
        P: Policy<Action = Array1<f32>>,
    {
        check_policy_history(policy.history_length(), self.config.history_length)?;
        let mut controls = Vec::with_capacity(self.taxis.len());
        for (taxi, observation) in self.taxis.iter().zip(&self.observations) {
            let action = policy.select_action(observation, &taxi.history)?;
            let control = action.get(0).copied().ok_or_else(|| {
                ColavError::dimension_mismatch("action of size 1", "empty action")
            })?;
            controls.push(control as f64);
        }
        self.advance(&controls)
    }

    fn spawn(&mut self, random_distance: bool) -> Taxi {
        let heading = self.rng.gen_range(0.0..2.0 * PI);
        let tas = self.rng.gen_range(
            Self::CRUISE_SPEED - Self::SPEED_SPREAD..Self::CRUISE_SPEED + Self::SPEED_SPREAD,
        );

        let (bearing, distance) = if random_distance {
            (
                self.rng.gen_range(0.0..2.0 * PI),
                self.rng.gen_range(self.destination.radius..self.destination.spawn_radius),
            )
        } else {
            (heading, self.destination.spawn_radius)
        };

        let position = self.destination.position.advanced(bearing, distance);
        let goal_distance = position.distance_to(&self.destination.position);
        Taxi {
            aircraft: Aircraft::new(position, heading + PI, tas, Self::DELTA_T),
            history: HistoryBuffer::new(self.config.history_length),
            goal_distance,
            goal_distance_old: goal_distance,
        }
    }

    fn states(&self) -> Vec<EntityState> {
        self.taxis.iter().map(|t| t.aircraft.snapshot()).collect()
    }

    fn lifetimes(&self) -> Vec<u32> {
        self.taxis.iter().map(|t| t.aircraft.lifetime).collect()
    }

    fn observe_all(&self) -> Result<Vec<Observation>> {
        let states = self.states();
        let lifetimes = self.lifetimes();
        let timing = self.destination.timing();
        (0..self.taxis.len())
            .map(|i| {
                self.encoder
                    .encode(i, &states, &lifetimes, &self.destination.position, &timing)
            })
            .collect()
    }

    fn advance(&mut self, controls: &[f64]) -> Result<Transition> {
        if controls.len() != self.taxis.len() {
            return Err(ColavError::dimension_mismatch(
                format!("{} actions", self.taxis.len()),
                format!("{} actions", controls.len()),
            ));
        }
        self.step_count += 1;
        self.sim_time += Self::DELTA_T;

        for (taxi, observation) in self.taxis.iter_mut().zip(&self.observations) {
            taxi.history.push(observation.clone());
        }
        for (taxi, &control) in self.taxis.iter_mut().zip(controls) {
            taxi.aircraft.advance(control);
        }

        let lifetimes_before = self.lifetimes();
        if self.config.priority {
            for taxi in &mut self.taxis {
                taxi.aircraft.lifetime += 1;
            }
        }

        for taxi in &mut self.taxis {
            taxi.goal_distance_old = taxi.goal_distance;
            taxi.goal_distance = taxi.aircraft.position.distance_to(&self.destination.position);
        }
        let distances: Vec<f64> = self.taxis.iter().map(|t| t.goal_distance).collect();
        let (entered_closed, entered_open) = self.destination.step(&distances);

        self.count_mistakes(&entered_closed);
        self.handle_respawn(&entered_open);

        self.observations = self.observe_all()?;
        self.rewards = self.calculate_reward(&entered_closed, &entered_open, &lifetimes_before);
        let done = self.step_count >= Self::MAX_EPISODE_STEPS;

        trace!(
            "step {}: vertiport {}, {} accidents, {} incidents so far",
            self.step_count,
            if self.destination.is_open() { "open" } else { "closed" },
            self.accidents,
            self.incidents
        );
        if done {
            debug!(
                "UAM episode finished: {} accidents, {} incidents, {} closed entries",
                self.accidents, self.incidents, self.closed_entries
            );
        }

        Ok(Transition {
            observation: self.observations[0].clone(),
            reward: self.rewards[0].total(),
            done,
            breakdown: self.rewards[0],
        })
    }

    fn count_mistakes(&mut self, entered_closed: &[bool]) {
        self.closed_entries += entered_closed.iter().filter(|&&entered| entered).count();
        for i in 0..self.taxis.len() {
            for j in (i + 1)..self.taxis.len() {
                let d = self.taxis[i]
                    .aircraft
                    .position
                    .distance_to(&self.taxis[j].aircraft.position);
                if d <= Self::ACCIDENT_DISTANCE {
                    self.accidents += 1;
                } else if d <= Self::INCIDENT_DISTANCE {
                    self.incidents += 1;
                }
            }
        }
    }

    /// Replace aircraft that left the map or landed; their history starts over
    fn handle_respawn(&mut self, entered_open: &[bool]) {
        for i in 0..self.taxis.len() {
            let landed = entered_open[i];
            if !landed && self.taxis[i].goal_distance < self.destination.respawn_radius {
                continue;
            }
            // lifetime only restarts after landing
            let lifetime = if landed { 0 } else { self.taxis[i].aircraft.lifetime };
            let mut taxi = self.spawn(false);
            taxi.aircraft = taxi.aircraft.with_lifetime(lifetime);
            let reason = if landed { "landed" } else { "left the map" };
            debug!("respawning aircraft {} ({})", i, reason);
            self.taxis[i] = taxi;
        }
    }

    fn calculate_reward(
        &self,
        entered_closed: &[bool],
        entered_open: &[bool],
        lifetimes_before: &[u32],
    ) -> Vec<RewardBreakdown> {
        let n = self.taxis.len();
        let n_open_entries = entered_open.iter().filter(|&&entered| entered).count();
        let longest = lifetimes_before.iter().copied().max().unwrap_or(0);
        let destination = &self.destination;

        let collective = if destination.is_open() {
            -0.5 * destination.t_open_since() / destination.t_close()
        } else {
            0.25
        };

        let w_sum = self.config.w_coll + self.config.w_goal;
        (0..n)
            .map(|i| {
                let own = &self.taxis[i];
                let nearest = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| own.aircraft.position.distance_to(&self.taxis[j].aircraft.position))
                    .fold(f64::INFINITY, f64::min);

                let mut r_coll = if nearest <= Self::ACCIDENT_DISTANCE {
                    -10.0
                } else if nearest <= Self::INCIDENT_DISTANCE {
                    -5.0
                } else {
                    -(-nearest / (2.0 * Self::INCIDENT_DISTANCE)).exp()
                };
                // small margin against numerical noise at the spawn circle
                if own.goal_distance > destination.spawn_radius + 5.0 {
                    r_coll -= 5.0;
                }

                let has_priority = lifetimes_before[i] == longest;
                let mut r_goal = collective;
                if entered_closed[i] {
                    r_goal -= 5.0;
                }
                if entered_open[i] {
                    let rightful = n_open_entries == 1 && (!self.config.priority || has_priority);
                    r_goal += if rightful { 5.0 } else { -5.0 };
                }
                if self.config.priority && destination.was_open() && has_priority {
                    r_goal += (own.goal_distance_old - own.goal_distance) / 5.0;
                }

                RewardBreakdown {
                    collision: self.config.w_coll * r_coll / w_sum,
                    goal: self.config.w_goal * r_goal / w_sum,
                    ..Default::default()
                }
            })
            .collect()
    }
}

impl Environment for UamEnv {
    /// One heading-rate command per aircraft
    type Action = Array1<f32>;

    fn reset(&mut self) -> Result<Observation> {
        self.step_count = 0;
        self.sim_time = 0.0;
        self.accidents = 0;
        self.incidents = 0;
        self.closed_entries = 0;

        let n = if self.config.multi_policy {
            self.config.max_agents
        } else {
            let sizes: Vec<usize> = Self::FLEET_SIZES
                .iter()
                .copied()
                .filter(|&size| size <= self.config.max_agents)
                .collect();
            sizes.choose(&mut self.rng).copied().unwrap_or(2)
        };

        self.taxis = (0..n)
            .map(|_| {
                let random_distance = self.rng.gen_bool(0.5);
                self.spawn(random_distance)
            })
            .collect();

        if self.config.priority {
            let population = UamConfig::MAX_INITIAL_LIFETIME as usize + 1;
            let lifetimes = rand::seq::index::sample(&mut self.rng, population, n);
            for (taxi, lifetime) in self.taxis.iter_mut().zip(lifetimes.iter()) {
                taxi.aircraft.lifetime = lifetime as u32;
            }
            self.taxis[0].aircraft.lifetime = Self::LEADER_LIFETIME;
        }

        self.destination.reset();
        self.observations = self.observe_all()?;
        self.rewards = vec![RewardBreakdown::default(); n];

        debug!("UAM reset: {} aircraft", n);
        Ok(self.observations[0].clone())
    }

    fn step(&mut self, action: Array1<f32>) -> Result<Transition> {
        let controls: Vec<f64> = action.iter().map(|&a| a as f64).collect();
        self.advance(&controls)
    }

    fn frame(&self) -> Frame {
        let states = self.states();
        Frame {
            step: self.step_count,
            sim_time: self.sim_time,
            own: states[0],
            others: states[1..].to_vec(),
            goal: self.destination.position,
            reward: self.rewards.first().map(|r| r.total()).unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_destination_starts_open() {
        let destination = Destination::new(Position::new(10.0, -5.0), 1.0);

        assert!(destination.is_open());
        assert!(destination.was_open());
        assert_eq!(destination.t_next_open(), 0.0);
        assert_eq!(destination.t_open_since(), 0.0);
    }

    #[test]
    fn test_destination_closes_after_entry_and_reopens() {
        let mut destination = Destination::new(Position::default(), 1.0);

        let (closed, open) = destination.step(&[50.0, 500.0]);
        assert_eq!(open, vec![true, false]);
        assert_eq!(closed, vec![false, false]);
        assert!(!destination.is_open());
        assert_eq!(destination.t_next_open(), 60.0);

        let (closed, _) = destination.step(&[80.0]);
        assert_eq!(closed, vec![true]);

        for _ in 0..58 {
            destination.step(&[500.0]);
        }
        assert!(!destination.is_open());
        destination.step(&[500.0]);
        assert!(destination.is_open());
        assert_eq!(destination.t_open_since(), 0.0);
    }

    #[test]
    fn test_initial_lifetimes_are_distinct() {
        let config = UamConfig {
            max_agents: 6,
            multi_policy: true,
            seed: Some(11),
            ..Default::default()
        };
        let env = UamEnv::new(config).unwrap();

        let mut lifetimes: Vec<u32> = (0..env.fleet_size())
            .filter_map(|i| env.aircraft(i).map(|a| a.lifetime))
            .collect();
        assert_eq!(lifetimes[0], UamEnv::LEADER_LIFETIME);
        assert!(lifetimes[1..].iter().all(|&t| t <= UamConfig::MAX_INITIAL_LIFETIME));

        lifetimes.sort_unstable();
        lifetimes.dedup();
        assert_eq!(lifetimes.len(), 6);
    }

    #[test]
    fn test_multi_policy_step_checks_action_count() {
        let config = UamConfig {
            max_agents: 3,
            multi_policy: true,
            seed: Some(5),
            ..Default::default()
        };
        let mut env = UamEnv::new(config).unwrap();

        assert!(matches!(
            env.step(Array1::zeros(2)),
            Err(ColavError::DimensionMismatch { .. })
        ));
        let transition = env.step(Array1::zeros(3)).unwrap();
        assert_eq!(env.rewards().len(), 3);
        assert!((transition.reward - env.rewards()[0].total()).abs() < 1e-12);
        assert!((0..3).all(|i| env.history(i).map_or(false, |h| h.len() <= 1)));
    }
}
