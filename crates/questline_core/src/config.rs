//! Engine tuning configuration.
//!
//! # Responsibility
//! - Hold XP curve and reward defaults used by progression and generation.
//! - Load from JSON with per-field defaults, then validate.
//!
//! # Invariants
//! - `level_xp_base > 0`, so every level has a reachable, non-zero threshold.
//! - `max_subtask_target > 0`.
//! - Default rewards never exceed their caps.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const DEFAULT_LEVEL_XP_BASE: u64 = 100;
const DEFAULT_LEVEL_XP_STEP: u64 = 50;
const DEFAULT_XP_REWARD: u64 = 50;
const DEFAULT_FRAGMENT_REWARD: u64 = 1;
const DEFAULT_MAX_SUBTASK_TARGET: u32 = 10_000;
const DEFAULT_MAX_XP_REWARD: u64 = 10_000;
const DEFAULT_MAX_FRAGMENT_REWARD: u64 = 1_000;
const DEFAULT_HISTORY_SEPARATOR: &str = ", ";

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read engine config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse engine config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid engine config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Progression engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// XP needed to leave level 1.
    pub level_xp_base: u64,
    /// Extra XP needed per level above 1.
    pub level_xp_step: u64,
    /// XP reward when the generator omits one.
    pub default_xp_reward: u64,
    /// Fragment reward when the generator omits one.
    pub default_fragment_reward: u64,
    /// Generator subtasks with a larger target are discarded.
    pub max_subtask_target: u32,
    /// Generated XP rewards are clamped to this value.
    pub max_xp_reward: u64,
    /// Generated fragment rewards are clamped to this value.
    pub max_fragment_reward: u64,
    /// Joins completed daily mission names in generation history.
    pub history_separator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level_xp_base: DEFAULT_LEVEL_XP_BASE,
            level_xp_step: DEFAULT_LEVEL_XP_STEP,
            default_xp_reward: DEFAULT_XP_REWARD,
            default_fragment_reward: DEFAULT_FRAGMENT_REWARD,
            max_subtask_target: DEFAULT_MAX_SUBTASK_TARGET,
            max_xp_reward: DEFAULT_MAX_XP_REWARD,
            max_fragment_reward: DEFAULT_MAX_FRAGMENT_REWARD,
            history_separator: DEFAULT_HISTORY_SEPARATOR.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document; missing fields use defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_xp_base == 0 {
            return Err(ConfigError::Invalid("level_xp_base must be greater than 0"));
        }
        if self.max_subtask_target == 0 {
            return Err(ConfigError::Invalid(
                "max_subtask_target must be greater than 0",
            ));
        }
        if self.default_xp_reward > self.max_xp_reward {
            return Err(ConfigError::Invalid(
                "default_xp_reward must not exceed max_xp_reward",
            ));
        }
        if self.default_fragment_reward > self.max_fragment_reward {
            return Err(ConfigError::Invalid(
                "default_fragment_reward must not exceed max_fragment_reward",
            ));
        }
        Ok(())
    }

    /// XP required to advance from `level` to `level + 1`.
    pub fn xp_threshold(&self, level: u32) -> u64 {
        let above_first = u64::from(level.max(1) - 1);
        self.level_xp_base
            .saturating_add(above_first.saturating_mul(self.level_xp_step))
    }
}
