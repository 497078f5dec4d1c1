//! Core use-case services.
//!
//! # Responsibility
//! - Wire the progression engine to persistence, generation and
//!   presentation collaborators.
//! - Keep callers decoupled from storage details.

pub mod quest_service;
