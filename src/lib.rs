//! # colav - Recurrent Observation Encoding for Collision Avoidance
//!
//! colav provides the building blocks of reinforcement-learning agents that avoid
//! collisions among a changing number of moving entities: ships in open water or air taxis
//! sharing a vertiport. Its core is an observation encoder that packs a variable number of
//! other entities into a fixed-size vector, and a recurrent actor/critic encoder that reads
//! those observations over entities and over time.
//!
//! ## Key Features
//!
//! - **Geometry**: bearings, CPA/TCPA and angle normalization in a north/east frame
//! - **Observations**: collision-risk ranking, right-of-way classification, explicit absent slots
//! - **Recurrent Encoders**: inner recurrence over entities, outer recurrence over ticks
//! - **Heads**: deterministic, Gaussian, discrete, quantile and bootstrapped heads
//! - **Environments**: maritime and urban air mobility step loops
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colav::config::MaritimeConfig;
//! use colav::env::{Environment, MaritimeEnv};
//! use colav::network::RecurrentQNetwork;
//!
//! let mut env = MaritimeEnv::new(MaritimeConfig::default()).unwrap();
//! let config = env.encoder_config();
//! let q_network = RecurrentQNetwork::new(&config, 3, &mut rand::thread_rng()).unwrap();
//!
//! loop {
//!     let transition = env.step_with_policy(&q_network).unwrap();
//!     if transition.done {
//!         break;
//!     }
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Sigmoid, Tanh, Linear)
//! - [`config`] - Serde configuration of encoders and environments
//! - [`entity`] - Vessel and aircraft kinematics
//! - [`env`] - Environment step loops
//! - [`error`] - Error types and result handling
//! - [`geometry`] - Navigation utilities
//! - [`history`] - Per-track history of past observations
//! - [`layers`] - Dense and recurrent layers
//! - [`network`] - Encoders, heads and actor/critic assemblies
//! - [`observation`] - Observation layout, collision risk and situation classification

pub mod activations;
pub mod config;
pub mod entity;
pub mod env;
pub mod error;
pub mod geometry;
pub mod history;
pub mod layers;
pub mod network;
pub mod observation;

#[cfg(test)]
mod tests;
