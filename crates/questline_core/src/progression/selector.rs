//! Mission selector for the display list.
//!
//! # Responsibility
//! - Reduce epic missions to one visible candidate per goal.
//! - Apply status, rank and search filters and the ordering tie-break chain.
//!
//! # Invariants
//! - Pure and deterministic: equal inputs yield equal output order.
//! - "Active" output holds at most one non-special epic per goal, the
//!   lowest-rank incomplete one (first in input order on rank ties).
//! - Special epics bypass grouping and are always kept individually.
//! - Ordering: special first, then priority marks, then incomplete before
//!   complete, then the sort mode. Remaining ties keep input order.

use crate::model::mission::{EpicMission, ManualMission, MissionId, MissionRef};
use crate::model::rank::Rank;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Sort position of manual missions: after every rank.
const MANUAL_SORT_INDEX: usize = Rank::ALL.len();

/// Completion status view filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Active,
    Completed,
    All,
}

/// Rank view filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankFilter {
    #[default]
    Any,
    Rank(Rank),
    /// Only manual missions (rank sentinel `M`).
    Manual,
}

/// Final sort key after the fixed tie-break chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    RankAscending,
    CompletionDescending,
}

/// Selector inputs besides the mission collections.
#[derive(Debug, Clone, Default)]
pub struct SelectionQuery {
    pub status: StatusFilter,
    pub rank: RankFilter,
    /// Case-insensitive substring over mission name and goal name.
    pub search_term: String,
    pub sort: SortMode,
    pub priority_marks: HashSet<MissionId>,
}

/// Computes the ordered, one-per-goal display list.
pub fn select<'a>(
    epics: &'a [EpicMission],
    manuals: &'a [ManualMission],
    query: &SelectionQuery,
) -> Vec<MissionRef<'a>> {
    let mut missions: Vec<MissionRef<'a>> = Vec::new();

    if matches!(query.status, StatusFilter::Active | StatusFilter::All) {
        missions.extend(
            active_epic_indices(epics)
                .into_iter()
                .map(|index| MissionRef::Epic(&epics[index])),
        );
        missions.extend(
            manuals
                .iter()
                .filter(|manual| !manual.completed)
                .map(MissionRef::Manual),
        );
    }

    if matches!(query.status, StatusFilter::Completed | StatusFilter::All) {
        missions.extend(
            epics
                .iter()
                .filter(|epic| epic.completed && !epic.is_stuck())
                .map(MissionRef::Epic),
        );
        missions.extend(
            manuals
                .iter()
                .filter(|manual| manual.completed)
                .map(MissionRef::Manual),
        );
    }

    let needle = query.search_term.trim().to_lowercase();
    missions.retain(|mission| {
        matches_rank(mission, query.rank) && matches_search(mission, &needle)
    });
    missions.sort_by(|a, b| compare(a, b, query));
    missions
}

/// Indices of epics visible under the "active" status, in input order.
///
/// One linear pass keeps the lowest-rank incomplete epic per goal. Stuck
/// epics (completed but still holding an active daily) fill a goal only
/// when it has no incomplete candidate.
fn active_epic_indices(epics: &[EpicMission]) -> Vec<usize> {
    let mut best_per_goal: HashMap<&str, usize> = HashMap::new();
    let mut selected: Vec<usize> = Vec::new();

    for (index, epic) in epics.iter().enumerate() {
        if epic.completed {
            continue;
        }
        if epic.is_special() {
            selected.push(index);
            continue;
        }
        best_per_goal
            .entry(epic.goal_name.as_str())
            .and_modify(|best| {
                if epic.rank.order_index() < epics[*best].rank.order_index() {
                    *best = index;
                }
            })
            .or_insert(index);
    }

    let mut stuck_goals: HashSet<&str> = HashSet::new();
    for (index, epic) in epics.iter().enumerate() {
        if !epic.is_stuck() {
            continue;
        }
        if epic.is_special() {
            selected.push(index);
        } else if !best_per_goal.contains_key(epic.goal_name.as_str())
            && stuck_goals.insert(epic.goal_name.as_str())
        {
            selected.push(index);
        }
    }

    selected.extend(best_per_goal.into_values());
    selected.sort_unstable();
    selected
}

fn matches_rank(mission: &MissionRef<'_>, filter: RankFilter) -> bool {
    match filter {
        RankFilter::Any => true,
        RankFilter::Rank(rank) => mission.rank() == Some(rank),
        RankFilter::Manual => mission.rank().is_none(),
    }
}

fn matches_search(mission: &MissionRef<'_>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if mission.name().to_lowercase().contains(needle) {
        return true;
    }
    mission
        .as_epic()
        .is_some_and(|epic| epic.goal_name.to_lowercase().contains(needle))
}

fn sort_index(mission: &MissionRef<'_>) -> usize {
    mission
        .rank()
        .map_or(MANUAL_SORT_INDEX, Rank::order_index)
}

/// Completed and not stuck; stuck epics still sort with open work.
fn is_done(mission: &MissionRef<'_>) -> bool {
    mission.is_completed() && !mission.as_epic().is_some_and(EpicMission::is_stuck)
}

fn compare(a: &MissionRef<'_>, b: &MissionRef<'_>, query: &SelectionQuery) -> Ordering {
    let priority = |mission: &MissionRef<'_>| query.priority_marks.contains(&mission.id());

    b.is_special()
        .cmp(&a.is_special())
        .then_with(|| priority(b).cmp(&priority(a)))
        .then_with(|| is_done(a).cmp(&is_done(b)))
        .then_with(|| match query.sort {
            SortMode::RankAscending => sort_index(a).cmp(&sort_index(b)),
            SortMode::CompletionDescending => b
                .completion_ratio()
                .partial_cmp(&a.completion_ratio())
                .unwrap_or(Ordering::Equal),
        })
}
