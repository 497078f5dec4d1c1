//! Content generator collaborator contract and wire types.
//!
//! # Responsibility
//! - Define the request/response shapes exchanged with the generator.
//! - Decode raw generator JSON.
//!
//! # Invariants
//! - Wire field names are camelCase.
//! - Missing response fields decode to empty values and are rejected later
//!   by validation, never silently accepted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Generation request assembled from an epic mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub current_mission_name: String,
    pub goal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_deadline: Option<NaiveDate>,
    /// Completed daily mission names, joined.
    pub history_text: String,
    pub user_level: u32,
    pub feedback_text: String,
}

/// Candidate subtask as returned by the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubTaskCandidate {
    pub name: String,
    pub target: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Next daily mission candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationResponse {
    pub next_mission_name: String,
    pub next_mission_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragments: Option<u64>,
    pub learning_resources: Vec<String>,
    pub sub_tasks: Vec<SubTaskCandidate>,
}

/// Network or API failure reported by the generator transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "generator transport failed: {}", self.message)
    }
}

impl Error for TransportError {}

/// Malformed generator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingName,
    MissingDescription,
    /// Every candidate subtask was discarded by filtering.
    NoValidSubTasks { discarded: usize },
    MalformedPayload(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "generated mission has no name"),
            Self::MissingDescription => write!(f, "generated mission has no description"),
            Self::NoValidSubTasks { discarded } => write!(
                f,
                "generated mission has no valid subtasks ({discarded} discarded)"
            ),
            Self::MalformedPayload(message) => {
                write!(f, "generator payload is not valid JSON: {message}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Content generator collaborator.
pub trait ContentGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, TransportError>;
}

impl<G: ContentGenerator + ?Sized> ContentGenerator for &G {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, TransportError> {
        (**self).generate(request)
    }
}

/// Decodes a raw generator JSON payload.
pub fn parse_generation_response(raw: &str) -> Result<GenerationResponse, ValidationError> {
    serde_json::from_str(raw).map_err(|err| ValidationError::MalformedPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_generation_response, GenerationRequest, ValidationError};
    use chrono::NaiveDate;

    #[test]
    fn parses_camel_case_payload() {
        let response = parse_generation_response(
            r#"{
                "nextMissionName": "Left hand arpeggios",
                "nextMissionDescription": "Practice C major arpeggios",
                "xp": 80,
                "learningResources": ["https://example.com/arpeggios"],
                "subTasks": [{ "name": "Arpeggio runs", "target": 20, "unit": "runs" }]
            }"#,
        )
        .unwrap();

        assert_eq!(response.next_mission_name, "Left hand arpeggios");
        assert_eq!(response.xp, Some(80));
        assert_eq!(response.fragments, None);
        assert_eq!(response.sub_tasks[0].target, 20);
        assert_eq!(response.learning_resources.len(), 1);
    }

    #[test]
    fn missing_fields_decode_to_empty_values() {
        let response = parse_generation_response(r#"{ "subTasks": [{ "target": 5 }] }"#).unwrap();
        assert!(response.next_mission_name.is_empty());
        assert!(response.sub_tasks[0].name.is_empty());
    }

    #[test]
    fn rejects_non_json_payload() {
        let err = parse_generation_response("mission: piano").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedPayload(_)));
    }

    #[test]
    fn request_serializes_with_wire_names() {
        let request = GenerationRequest {
            current_mission_name: "Scales".to_string(),
            goal_name: "Learn Piano".to_string(),
            goal_deadline: NaiveDate::from_ymd_opt(2026, 12, 31),
            history_text: "Day 1, Day 2".to_string(),
            user_level: 4,
            feedback_text: "keep going".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["currentMissionName"], "Scales");
        assert_eq!(json["goalDeadline"], "2026-12-31");
        assert_eq!(json["userLevel"], 4);
    }
}
