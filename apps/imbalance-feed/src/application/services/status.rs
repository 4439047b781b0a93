//! Pump Liveness
//!
//! Shared, lock-light record of what the update pump is doing. The pump
//! writes it; the health endpoint and the pump's owner read it. A pump that
//! died leaves `Failed` and its last successful iteration behind, so a
//! stalled display can be told apart from a quiet market.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Pump lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpPhase {
    /// Spawned, no iteration finished yet.
    Starting,
    /// Iterating normally.
    Running,
    /// Exited cleanly after its logs were closed.
    Stopped,
    /// Exited on an unrecoverable fault.
    Failed,
}

impl PumpPhase {
    /// Get the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

/// Liveness state of one pump.
#[derive(Debug)]
pub struct PumpState {
    phase: RwLock<PumpPhase>,
    last_success_at: RwLock<Option<DateTime<Utc>>>,
    failure: RwLock<Option<String>>,
    iterations: AtomicU64,
    updates_sent: AtomicU64,
    sessions_completed: AtomicU64,
}

impl Default for PumpState {
    fn default() -> Self {
        Self::new()
    }
}

impl PumpState {
    /// Create state for a pump that has not run yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: RwLock::new(PumpPhase::Starting),
            last_success_at: RwLock::new(None),
            failure: RwLock::new(None),
            iterations: AtomicU64::new(0),
            updates_sent: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
        }
    }

    /// Record a finished iteration.
    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        *self.last_success_at.write() = Some(Utc::now());
        let mut phase = self.phase.write();
        if *phase == PumpPhase::Starting {
            *phase = PumpPhase::Running;
        }
    }

    /// Record an update handed to the dispatcher.
    pub fn record_update_sent(&self) {
        self.updates_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record completed live sessions.
    pub fn record_sessions_completed(&self, count: u64) {
        self.sessions_completed.fetch_add(count, Ordering::Relaxed);
    }

    /// Mark a clean exit.
    pub fn set_stopped(&self) {
        *self.phase.write() = PumpPhase::Stopped;
    }

    /// Mark a terminal failure.
    pub fn set_failed(&self, message: String) {
        *self.phase.write() = PumpPhase::Failed;
        *self.failure.write() = Some(message);
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PumpPhase {
        *self.phase.read()
    }

    /// Completion time of the last successful iteration.
    #[must_use]
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        *self.last_success_at.read()
    }

    /// Failure message, if the pump died.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.failure.read().clone()
    }

    /// Completed iterations.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Updates handed to the dispatcher.
    #[must_use]
    pub fn updates_sent(&self) -> u64 {
        self.updates_sent.load(Ordering::Relaxed)
    }

    /// Completed live sessions, including discarded ones.
    #[must_use]
    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_without_success() {
        let state = PumpState::new();
        assert_eq!(state.phase(), PumpPhase::Starting);
        assert!(state.last_success_at().is_none());
        assert_eq!(state.iterations(), 0);
    }

    #[test]
    fn first_iteration_moves_to_running() {
        let state = PumpState::new();
        state.record_iteration();
        state.record_iteration();

        assert_eq!(state.phase(), PumpPhase::Running);
        assert_eq!(state.iterations(), 2);
        assert!(state.last_success_at().is_some());
    }

    #[test]
    fn failure_keeps_last_success() {
        let state = PumpState::new();
        state.record_iteration();
        let before = state.last_success_at();

        state.set_failed("bad record".to_string());

        assert_eq!(state.phase(), PumpPhase::Failed);
        assert_eq!(state.failure().as_deref(), Some("bad record"));
        assert_eq!(state.last_success_at(), before);
    }

    #[test]
    fn stopped_is_not_overwritten_by_late_iteration_bookkeeping() {
        let state = PumpState::new();
        state.record_iteration();
        state.set_stopped();
        state.record_iteration();
        assert_eq!(state.phase(), PumpPhase::Stopped);
    }

    #[test]
    fn phase_serialization() {
        assert_eq!(
            serde_json::to_string(&PumpPhase::Running).unwrap(),
            "\"running\""
        );
        assert_eq!(PumpPhase::Failed.as_str(), "failed");
    }
}
