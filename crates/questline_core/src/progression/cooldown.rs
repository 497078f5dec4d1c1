//! Daily cooldown scheduler.
//!
//! # Responsibility
//! - Compute the countdown to the next local-day boundary for display.
//! - Fire the batch pending-generation trigger once per crossed boundary.
//! - Derive the cooldown overlay (`locked_until`) from `completed_at`.
//!
//! # Invariants
//! - The overlay is derived only; it never touches the ledger's
//!   `completed` flags.
//! - At most one batch trigger per local day. A boundary reached while a
//!   generation is in flight is deferred to a later tick of the same day.

use crate::generation::gate::GenerationGate;
use crate::model::mission::EpicMission;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use log::{info, warn};

/// Batch "generate pending daily missions" collaborator.
///
/// Fire-and-forget and assumed idempotent per calendar day. Failures are
/// logged by the scheduler and never retried.
pub trait PendingGenerationTrigger {
    type Error: std::error::Error;

    fn generate_pending(&self) -> Result<(), Self::Error>;
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same day as the previous tick.
    Idle,
    /// Boundary crossed and the batch trigger was invoked.
    Triggered,
    /// Boundary crossed while a generation was in flight.
    DeferredInFlight,
}

/// Tracks the last observed local day.
#[derive(Debug, Clone, Default)]
pub struct CooldownScheduler {
    current_day: Option<NaiveDate>,
}

impl CooldownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking from `now` without firing for the current day.
    pub fn starting_at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            current_day: Some(now.date_naive()),
        }
    }

    pub fn current_day(&self) -> Option<NaiveDate> {
        self.current_day
    }

    /// Advances the scheduler clock; call once per second from the host loop.
    pub fn tick<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        gate: &GenerationGate,
        trigger: &impl PendingGenerationTrigger,
    ) -> TickOutcome {
        let today = now.date_naive();
        let Some(previous) = self.current_day else {
            self.current_day = Some(today);
            return TickOutcome::Idle;
        };
        if today <= previous {
            return TickOutcome::Idle;
        }

        if let Some(holder) = gate.in_flight() {
            info!(
                "event=day_boundary module=cooldown status=skip day={today} in_flight_mission={holder}"
            );
            return TickOutcome::DeferredInFlight;
        }

        self.current_day = Some(today);
        match trigger.generate_pending() {
            Ok(()) => info!("event=day_boundary module=cooldown status=ok day={today}"),
            Err(err) => warn!(
                "event=day_boundary module=cooldown status=error day={today} error={err}"
            ),
        }
        TickOutcome::Triggered
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // Midnight can fall into a DST gap.
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// First instant of the local day after `now`.
pub fn next_day_boundary<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tomorrow = now.date_naive().succ_opt().unwrap_or(NaiveDate::MAX);
    start_of_day(&now.timezone(), tomorrow)
}

/// Whole seconds until the next local-day boundary.
pub fn countdown_seconds<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    (next_day_boundary(now) - now.clone()).num_seconds().max(0)
}

/// Formats seconds as `HH:MM:SS`.
pub fn format_countdown(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// End of the cooldown started by a completion at `completed_at_ms`.
pub fn locked_until<Tz: TimeZone>(completed_at_ms: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    let completed_at = tz.timestamp_millis_opt(completed_at_ms).single()?;
    Some(next_day_boundary(&completed_at))
}

/// Cooldown end for an epic whose latest daily completed at some point.
pub fn epic_locked_until<Tz: TimeZone>(epic: &EpicMission, tz: &Tz) -> Option<DateTime<Tz>> {
    locked_until(epic.last_completed_at()?, tz)
}

/// Whether interaction with `epic` is suppressed at `now`.
pub fn is_cooldown_locked<Tz: TimeZone>(epic: &EpicMission, now: &DateTime<Tz>) -> bool {
    epic_locked_until(epic, &now.timezone()).is_some_and(|until| *now < until)
}
