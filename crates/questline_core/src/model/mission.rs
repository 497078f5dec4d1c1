//! Mission domain model.
//!
//! # Responsibility
//! - Define epic, daily and manual missions and their countable subtasks.
//! - Provide read-only helpers shared by ledger, lifecycle and selector.
//!
//! # Invariants
//! - `0 <= SubTask::current <= SubTask::target` and `target > 0`.
//! - A daily mission is complete iff every subtask has `current == target`.
//! - At steady state an epic mission holds at most one daily mission with
//!   `completed == false` (the active slot); all others are history.
//! - Manual missions never carry a rank or a goal association.

use crate::model::feedback::FeedbackDirective;
use crate::model::rank::Rank;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every mission record.
pub type MissionId = Uuid;

/// Countable unit of progress owned by one daily or manual mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub name: String,
    pub target: u32,
    #[serde(default)]
    pub current: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl SubTask {
    /// Creates a fresh subtask with `current = 0`.
    pub fn new(name: impl Into<String>, target: u32, unit: Option<String>) -> Self {
        Self {
            name: name.into(),
            target,
            current: 0,
            unit,
        }
    }

    /// Amount still accepted before the target is reached.
    pub fn remaining(&self) -> u32 {
        self.target.saturating_sub(self.current)
    }

    pub fn is_satisfied(&self) -> bool {
        self.current == self.target
    }
}

/// Returns whether every subtask has reached its target exactly.
///
/// An empty list is never complete: a mission without countable work cannot
/// be finished through the ledger.
pub fn all_satisfied(sub_tasks: &[SubTask]) -> bool {
    !sub_tasks.is_empty() && sub_tasks.iter().all(SubTask::is_satisfied)
}

fn progress_ratio(sub_tasks: &[SubTask]) -> f64 {
    let target: u64 = sub_tasks.iter().map(|task| u64::from(task.target)).sum();
    if target == 0 {
        return 0.0;
    }
    let current: u64 = sub_tasks
        .iter()
        .map(|task| u64::from(task.current.min(task.target)))
        .sum();
    current as f64 / target as f64
}

/// Single-cycle quest belonging to an epic mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMission {
    pub id: MissionId,
    pub name: String,
    pub description: String,
    pub xp_reward: u64,
    /// Fragments granted on completion.
    pub item_reward: u64,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds of confirmed completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub sub_tasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learning_resources: Vec<String>,
}

impl DailyMission {
    /// Creates an active daily mission with a generated ID.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        xp_reward: u64,
        item_reward: u64,
        sub_tasks: Vec<SubTask>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            xp_reward,
            item_reward,
            completed: false,
            completed_at: None,
            sub_tasks,
            learning_resources: Vec::new(),
        }
    }

    pub fn all_subtasks_satisfied(&self) -> bool {
        all_satisfied(&self.sub_tasks)
    }
}

/// Event-like epic missions that bypass per-goal grouping in selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    /// Time-limited event, always visible while incomplete.
    Event,
}

/// Rank-tagged mission tied to a goal, made of a daily mission sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicMission {
    pub id: MissionId,
    pub name: String,
    pub rank: Rank,
    /// Goal association by name; goals have no separate ID.
    pub goal_name: String,
    #[serde(default)]
    pub completed: bool,
    pub daily_quota: u32,
    #[serde(default)]
    pub daily_missions: Vec<DailyMission>,
    #[serde(default)]
    pub level_requirement: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialKind>,
    /// Directive recorded at the last completion, consumed by the next
    /// successful generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_feedback: Option<FeedbackDirective>,
}

impl EpicMission {
    /// Creates an epic mission seeded with its first daily mission.
    pub fn new(
        name: impl Into<String>,
        rank: Rank,
        goal_name: impl Into<String>,
        daily_quota: u32,
        seed: Option<DailyMission>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rank,
            goal_name: goal_name.into(),
            completed: false,
            daily_quota,
            daily_missions: seed.into_iter().collect(),
            level_requirement: 0,
            special: None,
            pending_feedback: None,
        }
    }

    pub fn active_daily_index(&self) -> Option<usize> {
        self.daily_missions.iter().position(|daily| !daily.completed)
    }

    /// The single daily mission with `completed == false`, if any.
    pub fn active_daily(&self) -> Option<&DailyMission> {
        self.daily_missions.iter().find(|daily| !daily.completed)
    }

    pub fn completed_daily_count(&self) -> usize {
        self.daily_missions
            .iter()
            .filter(|daily| daily.completed)
            .count()
    }

    pub fn quota_met(&self) -> bool {
        self.completed_daily_count() >= self.daily_quota as usize
    }

    /// Marked completed while still holding an unfinished daily mission.
    pub fn is_stuck(&self) -> bool {
        self.completed && self.active_daily().is_some()
    }

    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }

    /// Completed daily count over quota, clamped to `[0, 1]`.
    pub fn completion_ratio(&self) -> f64 {
        if self.daily_quota == 0 {
            return if self.completed { 1.0 } else { 0.0 };
        }
        (self.completed_daily_count() as f64 / f64::from(self.daily_quota)).min(1.0)
    }

    /// Names of completed daily missions in sequence order.
    pub fn completed_history(&self) -> Vec<&str> {
        self.daily_missions
            .iter()
            .filter(|daily| daily.completed)
            .map(|daily| daily.name.as_str())
            .collect()
    }

    /// Epoch milliseconds of the most recent daily completion.
    pub fn last_completed_at(&self) -> Option<i64> {
        self.daily_missions
            .iter()
            .filter_map(|daily| daily.completed_at)
            .max()
    }
}

/// User-authored mission outside rank and goal progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMission {
    pub id: MissionId,
    pub name: String,
    pub description: String,
    pub xp_reward: u64,
    pub item_reward: u64,
    pub sub_tasks: Vec<SubTask>,
    #[serde(default)]
    pub completed: bool,
}

impl ManualMission {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sub_tasks: Vec<SubTask>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            xp_reward: 0,
            item_reward: 0,
            sub_tasks,
            completed: false,
        }
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.completed {
            return 1.0;
        }
        progress_ratio(&self.sub_tasks)
    }
}

/// Discriminator of the mission union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Epic,
    Manual,
}

/// Borrowed view over either mission kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissionRef<'a> {
    Epic(&'a EpicMission),
    Manual(&'a ManualMission),
}

impl<'a> MissionRef<'a> {
    pub fn kind(&self) -> MissionKind {
        match self {
            Self::Epic(_) => MissionKind::Epic,
            Self::Manual(_) => MissionKind::Manual,
        }
    }

    pub fn id(&self) -> MissionId {
        match self {
            Self::Epic(epic) => epic.id,
            Self::Manual(manual) => manual.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Epic(epic) => epic.name.as_str(),
            Self::Manual(manual) => manual.name.as_str(),
        }
    }

    /// `None` for manual missions.
    pub fn rank(&self) -> Option<Rank> {
        match self {
            Self::Epic(epic) => Some(epic.rank),
            Self::Manual(_) => None,
        }
    }

    /// Rank label including the manual sentinel.
    pub fn rank_label(&self) -> &'static str {
        match self.rank() {
            Some(rank) => rank.as_str(),
            None => crate::model::rank::MANUAL_RANK_SENTINEL,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            Self::Epic(epic) => epic.completed,
            Self::Manual(manual) => manual.completed,
        }
    }

    pub fn is_special(&self) -> bool {
        match self {
            Self::Epic(epic) => epic.is_special(),
            Self::Manual(_) => false,
        }
    }

    pub fn completion_ratio(&self) -> f64 {
        match self {
            Self::Epic(epic) => epic.completion_ratio(),
            Self::Manual(manual) => manual.completion_ratio(),
        }
    }

    pub fn as_epic(&self) -> Option<&'a EpicMission> {
        match self {
            Self::Epic(epic) => Some(epic),
            Self::Manual(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{all_satisfied, DailyMission, EpicMission, ManualMission, SubTask};
    use crate::model::rank::Rank;

    fn daily(name: &str, completed: bool) -> DailyMission {
        let sub_tasks = vec![SubTask::new("reps", 5, None)];
        let mut mission = DailyMission::new(name, "desc", 10, 1, sub_tasks);
        mission.completed = completed;
        mission
    }

    #[test]
    fn empty_subtask_list_is_never_satisfied() {
        assert!(!all_satisfied(&[]));
    }

    #[test]
    fn active_daily_is_first_incomplete_entry() {
        let mut epic = EpicMission::new("Scales", Rank::E, "Learn Piano", 3, None);
        epic.daily_missions = vec![daily("day 1", true), daily("day 2", false)];

        assert_eq!(epic.active_daily_index(), Some(1));
        assert_eq!(epic.completed_daily_count(), 1);
        assert_eq!(epic.completed_history(), vec!["day 1"]);
        assert!(!epic.is_stuck());

        epic.completed = true;
        assert!(epic.is_stuck());
    }

    #[test]
    fn completion_ratio_is_clamped() {
        let mut epic = EpicMission::new("Scales", Rank::E, "Learn Piano", 1, None);
        epic.daily_missions = vec![daily("a", true), daily("b", true)];
        assert_eq!(epic.completion_ratio(), 1.0);
    }

    #[test]
    fn manual_ratio_follows_subtask_progress() {
        let mut manual = ManualMission::new(
            "Clean desk",
            "",
            vec![SubTask::new("drawers", 2, None), SubTask::new("cables", 2, None)],
        );
        manual.sub_tasks[0].current = 2;
        assert_eq!(manual.completion_ratio(), 0.5);
    }
}
