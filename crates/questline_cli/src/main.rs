//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `questline_core` linkage and print its version.
//! - With a database path, print the active mission board and the
//!   countdown to the next daily refresh.
//!
//! Usage: `questline_cli [DB_PATH] [CONFIG_JSON]`

use chrono::Local;
use log::info;
use questline_core::progression::cooldown::{
    countdown_seconds, format_countdown, is_cooldown_locked,
};
use questline_core::{
    default_log_level, init_logging, ContentGenerator, EngineConfig, GenerationGate,
    GenerationOrchestrator, GenerationRequest, GenerationResponse, PresentationSink,
    ProgressionEvent, QuestService, SelectionQuery, SqliteSnapshotStore, TransportError,
};
use std::process::ExitCode;
use std::sync::Arc;

const LOG_DIR_ENV: &str = "QUESTLINE_LOG_DIR";

/// The board view never generates content.
struct OfflineGenerator;

impl ContentGenerator for OfflineGenerator {
    fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse, TransportError> {
        Err(TransportError::new("no content generator configured"))
    }
}

struct StdoutSink;

impl PresentationSink for StdoutSink {
    fn on_progression(&self, event: &ProgressionEvent) {
        println!(
            "completed {} +{}xp +{} fragments level={}",
            event.mission_name, event.xp_gained, event.fragments_gained, event.new_level
        );
    }
}

fn main() -> ExitCode {
    println!("questline_core version={}", questline_core::core_version());

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    match print_board(&db_path, args.next().as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_board(db_path: &str, config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let conn = questline_core::db::open_db(db_path)?;
    let orchestrator =
        GenerationOrchestrator::new(OfflineGenerator, Arc::new(GenerationGate::new()), config);
    let service = QuestService::new(SqliteSnapshotStore::new(&conn), orchestrator, StdoutSink);

    let state = service.load_state()?;
    let now = Local::now();
    let board = state.select(&SelectionQuery::default());
    info!(
        "event=board_render module=cli status=ok missions={}",
        board.len()
    );

    println!(
        "level={} xp={} fragments={}",
        state.profile.level, state.profile.xp, state.profile.fragments
    );
    for mission in &board {
        let cooldown = mission
            .as_epic()
            .filter(|epic| is_cooldown_locked(epic, &now))
            .map(|_| " (cooldown)")
            .unwrap_or_default();
        println!(
            "[{}] {} {:.0}%{cooldown}",
            mission.rank_label(),
            mission.name(),
            mission.completion_ratio() * 100.0
        );
    }
    println!("next refresh in {}", format_countdown(countdown_seconds(&now)));
    Ok(())
}
