//! Player profile and goals.
//!
//! # Invariants
//! - `level >= 1`.
//! - Goal names are unique within a profile; they are the association key
//!   used by epic missions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// User-defined goal that spawns epic missions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
}

impl Goal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deadline: None,
            completed: false,
        }
    }
}

/// Progression totals plus owned goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub fragments: u64,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            fragments: 0,
            goals: Vec::new(),
        }
    }
}

impl PlayerProfile {
    /// Looks up a goal by its exact name.
    pub fn goal(&self, name: &str) -> Option<&Goal> {
        self.goals.iter().find(|goal| goal.name == name)
    }
}
