//! Single global in-flight marker for generation requests.
//!
//! # Invariants
//! - At most one generation request is in flight system-wide, whatever
//!   mission it targets.
//! - A rejected acquire never changes the current holder.
//! - The marker is released when the guard drops, on success or failure.

use crate::model::mission::MissionId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A generation was requested while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyRejection {
    pub requested: MissionId,
    pub in_flight: MissionId,
}

impl Display for ConcurrencyRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "generation busy: mission {} is in flight, rejected request for {}",
            self.in_flight, self.requested
        )
    }
}

impl Error for ConcurrencyRejection {}

/// Holder of the in-flight marker, keyed by the requesting mission ID.
#[derive(Debug, Default)]
pub struct GenerationGate {
    in_flight: Mutex<Option<MissionId>>,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<MissionId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mission currently holding the marker.
    pub fn in_flight(&self) -> Option<MissionId> {
        *self.slot()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight().is_some()
    }

    /// Sets the marker for `mission_id` or rejects immediately.
    pub fn try_acquire(
        &self,
        mission_id: MissionId,
    ) -> Result<InFlightGuard<'_>, ConcurrencyRejection> {
        let mut slot = self.slot();
        if let Some(in_flight) = *slot {
            return Err(ConcurrencyRejection {
                requested: mission_id,
                in_flight,
            });
        }
        *slot = Some(mission_id);
        Ok(InFlightGuard {
            gate: self,
            mission_id,
        })
    }
}

/// Releases the in-flight marker on drop.
#[derive(Debug)]
pub struct InFlightGuard<'gate> {
    gate: &'gate GenerationGate,
    mission_id: MissionId,
}

impl InFlightGuard<'_> {
    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.gate.slot();
        if *slot == Some(self.mission_id) {
            *slot = None;
        }
    }
}
