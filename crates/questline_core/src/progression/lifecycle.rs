//! Daily mission lifecycle per epic mission.
//!
//! # Responsibility
//! - Derive the epic state (`Locked`, `Awaiting`, `Active`, `Completed`).
//! - Close the active daily slot and append newly generated dailies.
//!
//! # Invariants
//! - At most one daily mission per epic has `completed == false`.
//! - A daily mission is only closed when every subtask meets its target.
//! - The epic becomes completed once completed dailies reach `daily_quota`.
//! - `Locked` is left only by appending a daily (breakthrough generation).
//! - All operations return a replacement epic; inputs are never mutated.

use crate::model::feedback::FeedbackDirective;
use crate::model::mission::{DailyMission, EpicMission, MissionId};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Derived lifecycle state of one epic mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpicState {
    /// Level requirement unmet and no daily mission yet.
    Locked,
    /// Needs generation of its next daily mission.
    Awaiting,
    /// Holds exactly one incomplete daily mission.
    Active,
    /// Daily quota reached.
    Completed,
}

impl EpicState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Awaiting => "awaiting",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Display for EpicState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle transition errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Appending would create a second active daily mission.
    ActiveSlotOccupied(MissionId),
    /// No daily mission is active.
    NoActiveDaily(MissionId),
    /// The active daily still has unmet subtasks.
    IncompleteSubTasks(MissionId),
    /// The epic mission already reached its quota.
    Terminal(MissionId),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActiveSlotOccupied(id) => {
                write!(f, "epic mission already has an active daily mission: {id}")
            }
            Self::NoActiveDaily(id) => write!(f, "epic mission has no active daily mission: {id}"),
            Self::IncompleteSubTasks(id) => {
                write!(f, "active daily mission has unmet subtasks: {id}")
            }
            Self::Terminal(id) => write!(f, "epic mission is already completed: {id}"),
        }
    }
}

impl Error for LifecycleError {}

/// Derives the lifecycle state for `epic` given the player's level.
pub fn epic_state(epic: &EpicMission, user_level: u32) -> EpicState {
    if epic.active_daily().is_some() {
        return EpicState::Active;
    }
    if epic.completed || epic.quota_met() {
        return EpicState::Completed;
    }
    if epic.daily_missions.is_empty() && user_level < epic.level_requirement {
        return EpicState::Locked;
    }
    EpicState::Awaiting
}

/// Closes the active daily mission at `completed_at_ms`.
///
/// Records `feedback` for the next generation and completes the epic when
/// the quota is reached.
pub fn complete_active(
    epic: &EpicMission,
    completed_at_ms: i64,
    feedback: Option<FeedbackDirective>,
) -> Result<EpicMission, LifecycleError> {
    let index = epic
        .active_daily_index()
        .ok_or(LifecycleError::NoActiveDaily(epic.id))?;
    if !epic.daily_missions[index].all_subtasks_satisfied() {
        return Err(LifecycleError::IncompleteSubTasks(epic.id));
    }

    let mut updated = epic.clone();
    let daily = &mut updated.daily_missions[index];
    daily.completed = true;
    daily.completed_at = Some(completed_at_ms);
    if feedback.is_some() {
        updated.pending_feedback = feedback;
    }
    if updated.quota_met() {
        updated.completed = true;
    }

    info!(
        "event=daily_complete module=lifecycle status=ok epic_id={} completed={}/{} state={}",
        updated.id,
        updated.completed_daily_count(),
        updated.daily_quota,
        if updated.completed { "completed" } else { "awaiting" }
    );
    Ok(updated)
}

/// Appends a freshly generated daily mission as the new active slot.
///
/// Consumes any pending feedback directive.
pub fn append_daily(
    epic: &EpicMission,
    daily: DailyMission,
) -> Result<EpicMission, LifecycleError> {
    if epic.active_daily().is_some() {
        return Err(LifecycleError::ActiveSlotOccupied(epic.id));
    }
    if epic.completed || epic.quota_met() {
        return Err(LifecycleError::Terminal(epic.id));
    }

    let mut daily = daily;
    daily.completed = false;
    daily.completed_at = None;
    for sub_task in &mut daily.sub_tasks {
        sub_task.current = 0;
    }

    let mut updated = epic.clone();
    updated.daily_missions.push(daily);
    updated.pending_feedback = None;
    Ok(updated)
}
