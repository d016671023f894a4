//! # Configuration
//!
//! Plain serde structs for the encoder and the two environments. Every field has a default,
//! so a JSON document only has to name the values it changes:
//!
//! ```rust
//! use colav::config::{from_json_str, MaritimeConfig, TargetCount};
//!
//! let config: MaritimeConfig = from_json_str(r#"{ "target_count": { "fixed": 2 } }"#).unwrap();
//! assert_eq!(config.target_count, TargetCount::Fixed(2));
//! assert_eq!(config.max_targets, 3);
//! ```
//!
//! Validation happens when a component is built from a config, not when it is parsed.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ColavError, Result};
use crate::layers::RecurrentKind;
use crate::observation::{ObservationLayout, StateDesign};

/// Parse a config from a JSON string
pub fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Load a config from a JSON file
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    from_json_str(&contents)
}

/// Write a config as pretty-printed JSON
pub fn save_json<T: Serialize, P: AsRef<Path>>(config: &T, path: P) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// Sizes of the spatial-temporal encoder and the heads on top of it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub own_features: usize,
    pub block_width: usize,
    /// Maximum number of entity blocks per observation
    pub capacity: usize,
    pub inner_hidden: usize,
    pub outer_hidden: usize,
    pub head_hidden: usize,
    /// Number of past ticks fed to the outer recurrence
    pub history_length: usize,
    pub recurrent: RecurrentKind,
    /// Feed past actions alongside past observations
    pub use_past_actions: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            own_features: 4,
            block_width: 6,
            capacity: 3,
            inner_hidden: 64,
            outer_hidden: 64,
            head_hidden: 64,
            history_length: 2,
            recurrent: RecurrentKind::Gru,
            use_past_actions: false,
        }
    }
}

impl EncoderConfig {
    /// Default sizes for observations of the given layout, reading `history_length` past ticks
    pub fn for_layout(layout: ObservationLayout, history_length: usize) -> Self {
        EncoderConfig {
            own_features: layout.own_features,
            block_width: layout.block_width,
            capacity: layout.capacity,
            history_length,
            ..Default::default()
        }
    }

    pub fn layout(&self) -> Result<ObservationLayout> {
        ObservationLayout::new(self.own_features, self.block_width, self.capacity)
    }

    pub fn validate(&self) -> Result<()> {
        if self.use_past_actions {
            return Err(ColavError::not_implemented(
                "recurrent encoding of past actions",
            ));
        }
        for (name, value) in [
            ("inner_hidden", self.inner_hidden),
            ("outer_hidden", self.outer_hidden),
            ("head_hidden", self.head_hidden),
        ] {
            if value == 0 {
                return Err(ColavError::invalid_parameter(name, "must be positive"));
            }
        }
        self.layout().map(|_| ())
    }
}

/// How target ships are placed at reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Targets cross the own ship's line to the goal
    #[default]
    Line,
    Center,
    LineV2,
}

/// Number of target ships per episode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCount {
    /// Sampled from `{0, 1, 2, 3}` with probabilities `{0.1, 0.3, 0.3, 0.3}`
    #[default]
    Random,
    Fixed(usize),
    /// Grows over the course of training
    Increasing,
}

/// Weights of the maritime reward components, normalized by their sum
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub distance: f64,
    pub heading: f64,
    pub collision: f64,
    pub colreg: f64,
    pub comfort: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        RewardWeights {
            distance: 0.05,
            heading: 2.0,
            collision: 1.8,
            colreg: 2.0,
            comfort: 0.3,
        }
    }
}

impl RewardWeights {
    pub fn sum(&self) -> f64 {
        self.distance + self.heading + self.collision + self.colreg + self.comfort
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaritimeConfig {
    pub spawn_mode: SpawnMode,
    pub target_count: TargetCount,
    pub max_targets: usize,
    pub state_design: StateDesign,
    pub weights: RewardWeights,
    /// Penalize turns only while every risk is low
    pub adaptive_comfort: bool,
    /// Collision penalty `-sqrt(risk)` instead of `-risk`
    pub nonlinear_collision: bool,
    /// Targets farther than this from the own ship are respawned; `None` disables respawning
    pub respawn_radius: Option<f64>,
    /// Past observations kept for the own ship
    pub history_length: usize,
    pub seed: Option<u64>,
}

impl Default for MaritimeConfig {
    fn default() -> Self {
        MaritimeConfig {
            spawn_mode: SpawnMode::Line,
            target_count: TargetCount::Random,
            max_targets: 3,
            state_design: StateDesign::Recurrent,
            weights: RewardWeights::default(),
            adaptive_comfort: true,
            nonlinear_collision: true,
            respawn_radius: None,
            history_length: 2,
            seed: None,
        }
    }
}

impl MaritimeConfig {
    pub fn validate(&self) -> Result<()> {
        match self.spawn_mode {
            SpawnMode::Line => {}
            SpawnMode::Center => return Err(ColavError::not_implemented("spawn mode 'center'")),
            SpawnMode::LineV2 => return Err(ColavError::not_implemented("spawn mode 'line_v2'")),
        }
        match self.target_count {
            TargetCount::Random if self.max_targets < 3 => {
                return Err(ColavError::invalid_parameter(
                    "max_targets",
                    "random target counts need room for three targets",
                ));
            }
            TargetCount::Fixed(n) if n > self.max_targets => {
                return Err(ColavError::invalid_parameter(
                    "target_count",
                    format!("{} targets exceed max_targets = {}", n, self.max_targets),
                ));
            }
            TargetCount::Increasing => {
                return Err(ColavError::not_implemented("increasing target counts"));
            }
            _ => {}
        }
        if self.weights.sum() <= 0.0 {
            return Err(ColavError::invalid_parameter("weights", "must have a positive sum"));
        }
        if let Some(radius) = self.respawn_radius {
            if radius <= 0.0 {
                return Err(ColavError::invalid_parameter("respawn_radius", "must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UamConfig {
    /// Fleet size in multi-policy mode, and the largest fleet an observation can describe
    pub max_agents: usize,
    /// Every aircraft acts on its own instead of through one shared policy
    pub multi_policy: bool,
    /// Grant landing priority to the aircraft that has been flying longest
    pub priority: bool,
    pub w_coll: f64,
    pub w_goal: f64,
    /// Past ticks kept per aircraft in single-policy mode
    pub history_length: usize,
    pub seed: Option<u64>,
}

impl Default for UamConfig {
    fn default() -> Self {
        UamConfig {
            max_agents: 10,
            multi_policy: false,
            priority: true,
            w_coll: 1.0,
            w_goal: 1.0,
            history_length: 2,
            seed: None,
        }
    }
}

impl UamConfig {
    /// Initial lifetimes are drawn without replacement from `0..=60`
    pub const MAX_INITIAL_LIFETIME: u32 = 60;

    pub fn validate(&self) -> Result<()> {
        if self.max_agents < 2 {
            return Err(ColavError::invalid_parameter("max_agents", "need at least two aircraft"));
        }
        if self.priority && self.max_agents > Self::MAX_INITIAL_LIFETIME as usize + 1 {
            return Err(ColavError::invalid_parameter(
                "max_agents",
                format!(
                    "at most {} aircraft can receive distinct initial lifetimes",
                    Self::MAX_INITIAL_LIFETIME + 1
                ),
            ));
        }
        if self.w_coll < 0.0 || self.w_goal < 0.0 || self.w_coll + self.w_goal <= 0.0 {
            return Err(ColavError::invalid_parameter(
                "w_coll/w_goal",
                "must be non-negative with a positive sum",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: UamConfig =
            from_json_str(r#"{ "multi_policy": true, "w_coll": 2.0 }"#).unwrap();
        assert!(config.multi_policy);
        assert_eq!(config.w_coll, 2.0);
        assert_eq!(config.max_agents, 10);
        assert_eq!(config.history_length, 2);
    }

    #[test]
    fn test_unfinished_variants_are_rejected() {
        let config = MaritimeConfig {
            spawn_mode: SpawnMode::Center,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ColavError::NotImplemented(_))));

        let config = EncoderConfig {
            use_past_actions: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ColavError::NotImplemented(_))));
    }

    #[test]
    fn test_fixed_target_count_bounded_by_capacity() {
        let config = MaritimeConfig {
            target_count: TargetCount::Fixed(4),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ColavError::InvalidParameter { .. })));
    }
}
