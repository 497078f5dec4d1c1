//! Daily mission generation.
//!
//! # Responsibility
//! - Define the content generator collaborator and its wire shapes.
//! - Guard generation with a single system-wide in-flight marker.
//! - Validate candidates before they become active daily missions.

pub mod gate;
pub mod generator;
pub mod orchestrator;
