/// Session events
///
/// Events describe what already happened to the session (past tense).
/// They are broadcast to every subscriber of the event bus.
use std::time::{Duration, Instant};

use crate::state::{Phase, SessionState};

/// Notifications from the session controller to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session moved to a new phase
    PhaseChanged {
        old_phase: Phase,
        snapshot: SessionState,
        timestamp: Instant,
    },

    /// Clock tick while a session is active
    Tick { snapshot: SessionState },

    /// The sentinel stopped delivering frames; the session continues unwatched
    MonitoringDegraded {
        reason: String,
        snapshot: SessionState,
    },

    /// A start request was refused; the session stays idle
    StartRejected { reason: String },

    /// Application is shutting down
    Shutdown,
}

impl SessionEvent {
    /// State carried by the event, if any
    pub fn snapshot(&self) -> Option<&SessionState> {
        match self {
            SessionEvent::PhaseChanged { snapshot, .. }
            | SessionEvent::Tick { snapshot }
            | SessionEvent::MonitoringDegraded { snapshot, .. } => Some(snapshot),
            SessionEvent::StartRejected { .. } | SessionEvent::Shutdown => None,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::PhaseChanged {
                old_phase,
                snapshot,
                ..
            } => format!(
                "{} -> {} ({} left, {} violations)",
                old_phase.description(),
                snapshot.phase.description(),
                format_remaining(snapshot.remaining),
                snapshot.violation_count
            ),
            SessionEvent::Tick { snapshot } => {
                format!("{} left", format_remaining(snapshot.remaining))
            }
            SessionEvent::MonitoringDegraded { reason, .. } => {
                format!("Monitoring offline: {}", reason)
            }
            SessionEvent::StartRejected { reason } => format!("Cannot start: {}", reason),
            SessionEvent::Shutdown => "Shutting down".to_string(),
        }
    }
}

/// `MM:SS` countdown text, rounded up to the next whole second
pub fn format_remaining(remaining: Duration) -> String {
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
