//! Quest progression engine for goal gamification.
//! This crate is the single source of truth for mission and reward invariants.

pub mod config;
pub mod db;
pub mod generation;
pub mod logging;
pub mod model;
pub mod progression;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use generation::gate::{ConcurrencyRejection, GenerationGate, InFlightGuard};
pub use generation::generator::{
    parse_generation_response, ContentGenerator, GenerationRequest, GenerationResponse,
    SubTaskCandidate, TransportError, ValidationError,
};
pub use generation::orchestrator::{
    validate_response, GenerationContext, GenerationError, GenerationOrchestrator, Generated,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::feedback::{DifficultyRating, FeedbackDirective, ProgressionEvent};
pub use model::mission::{
    DailyMission, EpicMission, ManualMission, MissionId, MissionKind, MissionRef, SpecialKind,
    SubTask,
};
pub use model::profile::{Goal, PlayerProfile};
pub use model::rank::Rank;
pub use progression::cooldown::{CooldownScheduler, PendingGenerationTrigger, TickOutcome};
pub use progression::ledger::{ContributionRangeError, LedgerError};
pub use progression::lifecycle::{EpicState, LifecycleError};
pub use progression::selector::{RankFilter, SelectionQuery, SortMode, StatusFilter};
pub use repo::snapshot_repo::{SnapshotStore, SqliteSnapshotStore, StoreError, StoreResult};
pub use service::quest_service::{
    ContributionOutcome, PendingCompletion, PendingGenerationReport, PresentationSink,
    QuestError, QuestService, QuestState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
