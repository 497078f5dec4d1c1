//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-object-replace persistence contract.
//! - Isolate SQLite details from progression services.
//!
//! # Invariants
//! - Every write replaces the complete value stored under a key.
//! - Read paths reject undecodable persisted state instead of masking it.

pub mod snapshot_repo;
