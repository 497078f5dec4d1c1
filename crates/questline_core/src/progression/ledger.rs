//! SubTask contribution ledger.
//!
//! # Responsibility
//! - Validate and apply partial progress to one subtask.
//! - Report whether the owning mission would be complete afterwards.
//!
//! # Invariants
//! - `0 <= current <= target` before and after every contribution.
//! - A rejected contribution leaves the input untouched.
//! - The ledger never marks a mission completed; it only reports
//!   `mission_now_complete` so callers can intercept completion first.

use crate::model::mission::{all_satisfied, SubTask};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Contribution amount outside `1..=remaining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionRangeError {
    NonPositive { amount: i64 },
    ExceedsRemaining { amount: i64, remaining: u32 },
}

impl Display for ContributionRangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive { amount } => {
                write!(f, "contribution must be positive, got {amount}")
            }
            Self::ExceedsRemaining { amount, remaining } => write!(
                f,
                "contribution {amount} exceeds remaining amount {remaining}"
            ),
        }
    }
}

impl Error for ContributionRangeError {}

/// Ledger failure: bad amount or unknown subtask position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    Range(ContributionRangeError),
    SubTaskNotFound { index: usize, len: usize },
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range(err) => write!(f, "{err}"),
            Self::SubTaskNotFound { index, len } => {
                write!(f, "subtask index {index} out of range for {len} subtasks")
            }
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Range(err) => Some(err),
            Self::SubTaskNotFound { .. } => None,
        }
    }
}

impl From<ContributionRangeError> for LedgerError {
    fn from(value: ContributionRangeError) -> Self {
        Self::Range(value)
    }
}

/// Result of an accepted contribution, not yet committed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    /// Full replacement subtask list for the owning mission.
    pub sub_tasks: Vec<SubTask>,
    pub new_current: u32,
    pub mission_now_complete: bool,
}

/// Input-boundary check: accepts `1..=remaining` and returns it as `u32`.
pub fn validate_amount(sub_task: &SubTask, amount: i64) -> Result<u32, ContributionRangeError> {
    if amount <= 0 {
        return Err(ContributionRangeError::NonPositive { amount });
    }
    let remaining = sub_task.remaining();
    match u32::try_from(amount) {
        Ok(accepted) if accepted <= remaining => Ok(accepted),
        _ => Err(ContributionRangeError::ExceedsRemaining { amount, remaining }),
    }
}

/// Applies `amount` to `sub_tasks[index]` and evaluates mission completion.
///
/// Completion is computed over the updated list before anything is marked
/// done, so feedback can be collected ahead of the commit.
pub fn contribute(
    sub_tasks: &[SubTask],
    index: usize,
    amount: i64,
) -> Result<Contribution, LedgerError> {
    let target = sub_tasks.get(index).ok_or(LedgerError::SubTaskNotFound {
        index,
        len: sub_tasks.len(),
    })?;
    let accepted = validate_amount(target, amount)?;

    let mut updated = sub_tasks.to_vec();
    let new_current = updated[index].current + accepted;
    updated[index].current = new_current;
    let mission_now_complete = all_satisfied(&updated);

    Ok(Contribution {
        sub_tasks: updated,
        new_current,
        mission_now_complete,
    })
}
