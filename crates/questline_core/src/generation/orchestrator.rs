//! Unlock / generation orchestrator.
//!
//! # Responsibility
//! - Assemble generation requests from an epic mission and its context.
//! - Enforce the single global in-flight request.
//! - Validate generator responses and append the new daily mission.
//!
//! # Invariants
//! - A concurrent request is rejected before any generator call.
//! - Failures (transport or validation) leave the epic untouched.
//! - Partial acceptance is disallowed: zero valid subtasks rejects the whole
//!   response.
//! - No automatic retry.

use crate::config::EngineConfig;
use crate::generation::gate::{ConcurrencyRejection, GenerationGate};
use crate::generation::generator::{
    ContentGenerator, GenerationRequest, GenerationResponse, TransportError, ValidationError,
};
use crate::model::feedback::FeedbackDirective;
use crate::model::mission::{DailyMission, EpicMission, MissionId, SubTask};
use crate::model::profile::Goal;
use crate::progression::feedback::{directive_text, fallback_text};
use crate::progression::lifecycle::{append_daily, epic_state, EpicState};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Generation failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    ConcurrencyRejection(ConcurrencyRejection),
    Validation(ValidationError),
    Transport(TransportError),
    /// Epic already holds an active daily mission or reached its quota.
    NotGeneratable {
        mission_id: MissionId,
        state: EpicState,
    },
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConcurrencyRejection(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::NotGeneratable { mission_id, state } => write!(
                f,
                "epic mission {mission_id} cannot generate a daily mission in state {state}"
            ),
        }
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConcurrencyRejection(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::NotGeneratable { .. } => None,
        }
    }
}

impl From<ConcurrencyRejection> for GenerationError {
    fn from(value: ConcurrencyRejection) -> Self {
        Self::ConcurrencyRejection(value)
    }
}

impl From<ValidationError> for GenerationError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransportError> for GenerationError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

/// Player context needed to assemble a request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    /// Goal the epic is associated with, when it still exists.
    pub goal: Option<&'a Goal>,
    pub user_level: u32,
}

/// Successful generation: the new daily and the replacement epic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub daily: DailyMission,
    pub epic: EpicMission,
}

/// Requests next daily missions from the content generator.
pub struct GenerationOrchestrator<G: ContentGenerator> {
    generator: G,
    gate: Arc<GenerationGate>,
    config: EngineConfig,
}

impl<G: ContentGenerator> GenerationOrchestrator<G> {
    pub fn new(generator: G, gate: Arc<GenerationGate>, config: EngineConfig) -> Self {
        Self {
            generator,
            gate,
            config,
        }
    }

    /// Shared in-flight marker, also consulted by the cooldown scheduler.
    pub fn gate(&self) -> &Arc<GenerationGate> {
        &self.gate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assembles the generator request for `epic`.
    ///
    /// Feedback precedence: explicit `feedback`, then the epic's pending
    /// directive, then a fallback that distinguishes breakthrough attempts
    /// on locked epics from plain continuation.
    pub fn build_request(
        &self,
        epic: &EpicMission,
        context: &GenerationContext<'_>,
        feedback: Option<&FeedbackDirective>,
    ) -> GenerationRequest {
        let breakthrough = epic_state(epic, context.user_level) == EpicState::Locked;
        let feedback_text = match feedback.or(epic.pending_feedback.as_ref()) {
            Some(directive) => directive_text(directive),
            None => fallback_text(breakthrough).to_string(),
        };

        GenerationRequest {
            current_mission_name: epic.name.clone(),
            goal_name: epic.goal_name.clone(),
            goal_deadline: context.goal.and_then(|goal| goal.deadline),
            history_text: epic
                .completed_history()
                .join(self.config.history_separator.as_str()),
            user_level: context.user_level,
            feedback_text,
        }
    }

    /// Generates and appends the next daily mission for `epic`.
    pub fn generate_next(
        &self,
        epic: &EpicMission,
        context: &GenerationContext<'_>,
        feedback: Option<&FeedbackDirective>,
    ) -> Result<Generated, GenerationError> {
        let state = epic_state(epic, context.user_level);
        if matches!(state, EpicState::Active | EpicState::Completed) {
            return Err(GenerationError::NotGeneratable {
                mission_id: epic.id,
                state,
            });
        }

        let _guard = self.gate.try_acquire(epic.id).map_err(|rejection| {
            warn!(
                "event=generation module=orchestrator status=rejected mission_id={} in_flight={}",
                epic.id, rejection.in_flight
            );
            rejection
        })?;

        let request = self.build_request(epic, context, feedback);
        info!(
            "event=generation module=orchestrator status=start mission_id={} breakthrough={}",
            epic.id,
            state == EpicState::Locked
        );

        let response = self.generator.generate(&request).map_err(|err| {
            error!(
                "event=generation module=orchestrator status=error mission_id={} error_code=transport error={err}",
                epic.id
            );
            err
        })?;

        let daily = validate_response(&response, &self.config).map_err(|err| {
            error!(
                "event=generation module=orchestrator status=error mission_id={} error_code=validation error={err}",
                epic.id
            );
            err
        })?;

        let updated = append_daily(epic, daily.clone())
            .map_err(|_| GenerationError::NotGeneratable {
                mission_id: epic.id,
                state,
            })?;

        info!(
            "event=generation module=orchestrator status=ok mission_id={} daily_id={} sub_tasks={}",
            epic.id,
            daily.id,
            daily.sub_tasks.len()
        );
        Ok(Generated {
            daily,
            epic: updated,
        })
    }
}

/// Converts a generator response into a fresh active daily mission.
///
/// Subtasks with a blank name or a target outside `1..=max_subtask_target`
/// are discarded; if none remain the whole response is rejected. XP and
/// fragment rewards are clamped to their configured maximums.
pub fn validate_response(
    response: &GenerationResponse,
    config: &EngineConfig,
) -> Result<DailyMission, ValidationError> {
    let name = response.next_mission_name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    let description = response.next_mission_description.trim();
    if description.is_empty() {
        return Err(ValidationError::MissingDescription);
    }

    let max_target = i64::from(config.max_subtask_target);
    let sub_tasks: Vec<SubTask> = response
        .sub_tasks
        .iter()
        .filter_map(|candidate| {
            let task_name = candidate.name.trim();
            if task_name.is_empty() || candidate.target <= 0 || candidate.target > max_target {
                return None;
            }
            let target = u32::try_from(candidate.target).ok()?;
            let unit = candidate
                .unit
                .as_deref()
                .map(str::trim)
                .filter(|unit| !unit.is_empty())
                .map(str::to_string);
            Some(SubTask::new(task_name, target, unit))
        })
        .collect();

    if sub_tasks.is_empty() {
        return Err(ValidationError::NoValidSubTasks {
            discarded: response.sub_tasks.len(),
        });
    }

    let mut daily = DailyMission::new(
        name,
        description,
        response
            .xp
            .unwrap_or(config.default_xp_reward)
            .min(config.max_xp_reward),
        response
            .fragments
            .unwrap_or(config.default_fragment_reward)
            .min(config.max_fragment_reward),
        sub_tasks,
    );
    daily.learning_resources = response
        .learning_resources
        .iter()
        .map(|resource| resource.trim())
        .filter(|resource| !resource.is_empty())
        .map(str::to_string)
        .collect();
    Ok(daily)
}

#[cfg(test)]
mod tests {
    use super::{validate_response, GenerationContext, GenerationError, GenerationOrchestrator};
    use crate::config::EngineConfig;
    use crate::generation::gate::GenerationGate;
    use crate::generation::generator::{
        ContentGenerator, GenerationRequest, GenerationResponse, SubTaskCandidate,
        TransportError, ValidationError,
    };
    use crate::model::feedback::{DifficultyRating, FeedbackDirective};
    use crate::model::mission::{DailyMission, EpicMission, SubTask};
    use crate::model::profile::Goal;
    use crate::model::rank::Rank;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::sync::Arc;

    struct ScriptedGenerator {
        response: Result<GenerationResponse, TransportError>,
        requests: RefCell<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(response: Result<GenerationResponse, TransportError>) -> Self {
            Self {
                response,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ContentGenerator for ScriptedGenerator {
        fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            self.response.clone()
        }
    }

    fn candidate(name: &str, target: i64) -> SubTaskCandidate {
        SubTaskCandidate {
            name: name.to_string(),
            target,
            unit: None,
        }
    }

    fn response(sub_tasks: Vec<SubTaskCandidate>) -> GenerationResponse {
        GenerationResponse {
            next_mission_name: "Arpeggios".to_string(),
            next_mission_description: "C major arpeggios".to_string(),
            sub_tasks,
            ..GenerationResponse::default()
        }
    }

    fn awaiting_epic() -> EpicMission {
        let sub_tasks = vec![SubTask::new("x", 1, None)];
        let mut done = DailyMission::new("Scales day 1", "", 10, 1, sub_tasks);
        done.sub_tasks[0].current = 1;
        done.completed = true;
        let mut epic = EpicMission::new("Scales", Rank::E, "Learn Piano", 3, Some(done));
        epic.pending_feedback = Some(FeedbackDirective {
            category: DifficultyRating::TooHard,
            free_text: None,
        });
        epic
    }

    fn orchestrator(generator: ScriptedGenerator) -> GenerationOrchestrator<ScriptedGenerator> {
        GenerationOrchestrator::new(
            generator,
            Arc::new(GenerationGate::new()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn filters_invalid_subtasks_but_keeps_valid_ones() {
        let daily = validate_response(
            &response(vec![candidate("", 5), candidate("Runs", 0), candidate("Runs", 12)]),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(daily.sub_tasks.len(), 1);
        assert_eq!(daily.sub_tasks[0].target, 12);
        assert_eq!(daily.xp_reward, EngineConfig::default().default_xp_reward);
        assert!(!daily.completed);
    }

    #[test]
    fn oversized_rewards_are_clamped_to_config_caps() {
        let config = EngineConfig::default();
        let mut greedy = response(vec![candidate("Runs", 3)]);
        greedy.xp = Some(u64::MAX);
        greedy.fragments = Some(u64::MAX);

        let daily = validate_response(&greedy, &config).unwrap();
        assert_eq!(daily.xp_reward, config.max_xp_reward);
        assert_eq!(daily.item_reward, config.max_fragment_reward);
    }

    #[test]
    fn rejects_response_without_name_or_description() {
        let mut unnamed = response(vec![candidate("Runs", 3)]);
        unnamed.next_mission_name = "  ".to_string();
        assert_eq!(
            validate_response(&unnamed, &EngineConfig::default()).unwrap_err(),
            ValidationError::MissingName
        );

        let mut undescribed = response(vec![candidate("Runs", 3)]);
        undescribed.next_mission_description.clear();
        assert_eq!(
            validate_response(&undescribed, &EngineConfig::default()).unwrap_err(),
            ValidationError::MissingDescription
        );
    }

    #[test]
    fn request_carries_pending_feedback_history_and_deadline() {
        let orchestrator = orchestrator(ScriptedGenerator::new(Ok(response(vec![candidate(
            "Runs", 4,
        )]))));
        let mut goal = Goal::new("Learn Piano");
        goal.deadline = NaiveDate::from_ymd_opt(2026, 12, 1);
        let context = GenerationContext {
            goal: Some(&goal),
            user_level: 3,
        };

        let generated = orchestrator
            .generate_next(&awaiting_epic(), &context, None)
            .unwrap();
        assert_eq!(generated.epic.daily_missions.len(), 2);
        assert!(generated.epic.pending_feedback.is_none());
        assert!(!orchestrator.gate().is_busy());

        let requests = orchestrator.generator.requests.borrow();
        assert!(requests[0].feedback_text.contains("-0.5%"));
        assert_eq!(requests[0].history_text, "Scales day 1");
        assert_eq!(requests[0].goal_deadline, goal.deadline);
        assert_eq!(requests[0].user_level, 3);
    }

    #[test]
    fn locked_epic_uses_breakthrough_fallback() {
        let orchestrator = orchestrator(ScriptedGenerator::new(Ok(response(vec![candidate(
            "Runs", 4,
        )]))));
        let mut locked = EpicMission::new("Sonata", Rank::B, "Learn Piano", 5, None);
        locked.level_requirement = 10;
        let context = GenerationContext {
            goal: None,
            user_level: 2,
        };

        let request = orchestrator.build_request(&locked, &context, None);
        assert!(request.feedback_text.contains("breakthrough"));

        let generated = orchestrator.generate_next(&locked, &context, None).unwrap();
        assert!(generated.epic.active_daily().is_some());
    }

    #[test]
    fn transport_failure_releases_marker_without_mutation() {
        let orchestrator =
            orchestrator(ScriptedGenerator::new(Err(TransportError::new("timeout"))));
        let epic = awaiting_epic();
        let context = GenerationContext {
            goal: None,
            user_level: 1,
        };

        let err = orchestrator.generate_next(&epic, &context, None).unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
        assert!(!orchestrator.gate().is_busy());
        assert_eq!(epic.daily_missions.len(), 1);
    }

    #[test]
    fn in_flight_marker_rejects_other_missions() {
        let orchestrator = orchestrator(ScriptedGenerator::new(Ok(response(vec![candidate(
            "Runs", 4,
        )]))));
        let holder = awaiting_epic();
        let other = awaiting_epic();
        let context = GenerationContext {
            goal: None,
            user_level: 1,
        };

        let _guard = orchestrator.gate().try_acquire(holder.id).unwrap();
        let err = orchestrator.generate_next(&other, &context, None).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ConcurrencyRejection(rejection) if rejection.in_flight == holder.id
        ));
        assert!(orchestrator.generator.requests.borrow().is_empty());
    }

    #[test]
    fn active_epic_is_not_generatable() {
        let orchestrator = orchestrator(ScriptedGenerator::new(Ok(response(vec![candidate(
            "Runs", 4,
        )]))));
        let seed = DailyMission::new("d1", "", 10, 1, vec![SubTask::new("x", 1, None)]);
        let active = EpicMission::new("Scales", Rank::E, "Learn Piano", 3, Some(seed));
        let context = GenerationContext {
            goal: None,
            user_level: 1,
        };

        let err = orchestrator.generate_next(&active, &context, None).unwrap_err();
        assert!(matches!(err, GenerationError::NotGeneratable { .. }));
    }
}
