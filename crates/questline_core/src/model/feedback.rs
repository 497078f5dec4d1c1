//! Difficulty feedback and progression event records.
//!
//! Both records are ephemeral: a directive is produced at completion time and
//! consumed once by the next generation call; an event is emitted once per
//! confirmed completion.

use serde::{Deserialize, Serialize};

/// Difficulty rating submitted when a daily mission completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyRating {
    TooEasy,
    Perfect,
    TooHard,
}

impl DifficultyRating {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooEasy => "too_easy",
            Self::Perfect => "perfect",
            Self::TooHard => "too_hard",
        }
    }
}

/// Rating plus optional user note, handed to the next generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDirective {
    pub category: DifficultyRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
}

/// Completion event delivered to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionEvent {
    pub mission_name: String,
    pub xp_gained: u64,
    pub fragments_gained: u64,
    pub level_up: bool,
    pub new_level: u32,
}
