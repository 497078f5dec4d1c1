//! Quest progression engine.
//!
//! # Responsibility
//! - Ledger: apply and clamp subtask contributions.
//! - Feedback and reward: translate ratings, compute XP and level effects.
//! - Lifecycle: track the single active daily mission per epic.
//! - Selector: compute the visible mission list.
//! - Cooldown: day boundary countdown and batch trigger.
//!
//! # Invariants
//! - Every function here is free of I/O except logging; persistence and
//!   generation are wired by `service::quest_service`.

pub mod cooldown;
pub mod feedback;
pub mod ledger;
pub mod lifecycle;
pub mod reward;
pub mod selector;
