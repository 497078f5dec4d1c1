//! Domain model for goals, missions and progression records.
//!
//! # Responsibility
//! - Define canonical data structures used by the progression engine.
//! - Keep persisted shapes serde-friendly for whole-object snapshots.
//!
//! # Invariants
//! - Every mission is identified by a stable `MissionId`.
//! - Goals are referenced by name, never by ID.

pub mod feedback;
pub mod mission;
pub mod profile;
pub mod rank;
