//! Reward and progression propagator.
//!
//! # Invariants
//! - `level_up` is decided by `xp + mission_xp >= threshold(level)` against
//!   the level held before the reward.
//! - XP above a threshold carries into the next level; several levels can be
//!   gained by one reward, and `new_level` reports the final one.
//! - Levels gained are found by bisection over the closed-form threshold
//!   sum, so the cost is logarithmic in the reward.
//! - The input profile is never mutated; a full replacement is returned.

use crate::config::EngineConfig;
use crate::model::feedback::ProgressionEvent;
use crate::model::profile::PlayerProfile;

/// Event plus the replacement profile to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardOutcome {
    pub event: ProgressionEvent,
    pub profile: PlayerProfile,
}

/// Computes XP, fragment and level effects of one confirmed completion.
pub fn propagate(
    profile: &PlayerProfile,
    mission_name: &str,
    xp_gained: u64,
    fragments_gained: u64,
    config: &EngineConfig,
) -> RewardOutcome {
    let start_level = profile.level.max(1);
    let total_xp = profile.xp.saturating_add(xp_gained);
    let (gained, spent) = levels_gained(start_level, total_xp, config);
    let level = start_level.saturating_add(gained);
    let level_up = gained > 0;
    let xp = total_xp - spent;

    let mut updated = profile.clone();
    updated.level = level;
    updated.xp = xp;
    updated.fragments = profile.fragments.saturating_add(fragments_gained);

    RewardOutcome {
        event: ProgressionEvent {
            mission_name: mission_name.to_string(),
            xp_gained,
            fragments_gained,
            level_up,
            new_level: level,
        },
        profile: updated,
    }
}

/// Most levels affordable from `level` with `xp`, and the XP they consume.
fn levels_gained(level: u32, xp: u64, config: &EngineConfig) -> (u32, u64) {
    let first = u128::from(config.xp_threshold(level));
    let step = u128::from(config.level_xp_step);
    if first == 0 {
        return (0, 0);
    }

    // Cost of the next `count` levels: count * first + step * count * (count - 1) / 2.
    let cost = |count: u128| -> u128 {
        let linear = count.saturating_mul(first);
        let triangle = count.saturating_mul(count.saturating_sub(1)) / 2;
        linear.saturating_add(triangle.saturating_mul(step))
    };

    let budget = u128::from(xp);
    let headroom = u128::from(u32::MAX - level);
    let (mut low, mut high) = (0_u128, (budget / first).min(headroom));
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if cost(mid) <= budget {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    let spent = u64::try_from(cost(low)).unwrap_or(xp);
    (u32::try_from(low).unwrap_or(0), spent)
}
