/// Focus session state machine
///
/// Represents one focus cycle with its countdown and violation tally. All
/// mutation goes through [`SessionState::apply`].
use std::time::Duration;

/// Phase of the focus session
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Phase {
    /// No session running
    #[default]
    Idle,

    /// Countdown running, monitoring for violations
    Focusing,

    /// Target object in view; countdown paused
    Violation,

    /// Countdown finished; waiting for the user to acknowledge
    Break,
}

impl Phase {
    /// Focusing or Violation
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Focusing | Phase::Violation)
    }

    /// Get a human-readable description of the phase
    pub fn description(&self) -> &'static str {
        match self {
            Phase::Idle => "Ready to focus",
            Phase::Focusing => "Focusing",
            Phase::Violation => "Phone spotted - clock paused",
            Phase::Break => "Break time",
        }
    }
}

/// Whether the sentinel is watching the camera
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum MonitoringStatus {
    /// No session, or the session is on break
    #[default]
    Offline,

    Active,

    /// The sentinel failed mid-session; violations can no longer be seen
    Degraded { reason: String },
}

impl MonitoringStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, MonitoringStatus::Degraded { .. })
    }
}

/// Input to the transition function
#[derive(Clone, PartialEq, Debug)]
pub enum SessionInput {
    Start { focus_duration: Duration },
    Tick { elapsed: Duration },
    ViolationStarted,
    ViolationCleared,
    MonitoringLost { reason: String },
    SkipToBreak,
    Acknowledge,
    Abort,
}

/// What a transition did
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    PhaseChanged { from: Phase, to: Phase },

    /// Same phase, new clock or monitoring values
    Updated,

    /// No row of the transition table matched
    Ignored,
}

/// Session state owned by the controller
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub remaining: Duration,
    pub violation_count: u32,
    pub monitoring: MonitoringStatus,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input.
    ///
    /// `remaining` only decreases while Focusing and `violation_count` only
    /// grows while a session is active. Inputs with no matching transition
    /// leave the state untouched and return [`Outcome::Ignored`].
    pub fn apply(&mut self, input: SessionInput) -> Outcome {
        let from = self.phase;

        match (from, input) {
            (Phase::Idle, SessionInput::Start { focus_duration }) => {
                *self = Self {
                    phase: Phase::Focusing,
                    remaining: focus_duration,
                    violation_count: 0,
                    monitoring: MonitoringStatus::Active,
                };
            }

            (Phase::Focusing, SessionInput::Tick { elapsed }) => {
                self.remaining = self.remaining.saturating_sub(elapsed);
                if !self.remaining.is_zero() {
                    return Outcome::Updated;
                }
                self.enter_break();
            }

            // Clock paused or finished; the tick still refreshes observers
            (Phase::Violation | Phase::Break, SessionInput::Tick { .. }) => {
                return Outcome::Updated
            }

            (Phase::Focusing, SessionInput::ViolationStarted) => {
                self.phase = Phase::Violation;
                self.violation_count += 1;
            }

            (Phase::Violation, SessionInput::ViolationCleared) => {
                self.phase = Phase::Focusing;
            }

            (Phase::Focusing, SessionInput::MonitoringLost { reason }) => {
                self.monitoring = MonitoringStatus::Degraded { reason };
                return Outcome::Updated;
            }

            // No clear will ever arrive; resume the clock with monitoring flagged
            (Phase::Violation, SessionInput::MonitoringLost { reason }) => {
                self.phase = Phase::Focusing;
                self.monitoring = MonitoringStatus::Degraded { reason };
            }

            (Phase::Focusing | Phase::Violation, SessionInput::SkipToBreak) => {
                self.remaining = Duration::ZERO;
                self.enter_break();
            }

            (Phase::Break, SessionInput::Acknowledge) => self.reset(),

            (Phase::Focusing | Phase::Violation | Phase::Break, SessionInput::Abort) => {
                self.reset()
            }

            _ => return Outcome::Ignored,
        }

        Outcome::PhaseChanged {
            from,
            to: self.phase,
        }
    }

    fn enter_break(&mut self) {
        self.phase = Phase::Break;
        self.monitoring = MonitoringStatus::Offline;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn focusing(minutes: u64) -> SessionState {
        let mut state = SessionState::new();
        state.apply(SessionInput::Start {
            focus_duration: MINUTE * minutes as u32,
        });
        state
    }

    fn tick(secs: u64) -> SessionInput {
        SessionInput::Tick {
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_phase_predicates() {
        assert!(!Phase::Idle.is_active());
        assert!(Phase::Focusing.is_active());
        assert!(Phase::Violation.is_active());
        assert!(!Phase::Break.is_active());
        assert_eq!(Phase::Break.description(), "Break time");
    }

    #[test]
    fn test_start_sets_countdown() {
        let state = focusing(45);
        assert_eq!(state.phase, Phase::Focusing);
        assert_eq!(state.remaining, MINUTE * 45);
        assert_eq!(state.violation_count, 0);
        assert_eq!(state.monitoring, MonitoringStatus::Active);
    }

    #[test]
    fn test_start_ignored_when_not_idle() {
        let mut state = focusing(10);
        let outcome = state.apply(SessionInput::Start {
            focus_duration: MINUTE * 90,
        });
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(state.remaining, MINUTE * 10);
    }

    #[test]
    fn test_tick_counts_down_then_breaks() {
        let mut state = focusing(5);
        assert_eq!(state.apply(tick(60)), Outcome::Updated);
        assert_eq!(state.remaining, MINUTE * 4);

        let outcome = state.apply(tick(400));
        assert_eq!(
            outcome,
            Outcome::PhaseChanged {
                from: Phase::Focusing,
                to: Phase::Break
            }
        );
        assert_eq!(state.remaining, Duration::ZERO);
        assert_eq!(state.monitoring, MonitoringStatus::Offline);
    }

    #[test]
    fn test_clock_paused_during_violation() {
        let mut state = focusing(20);
        state.apply(tick(30));
        let before = state.remaining;

        state.apply(SessionInput::ViolationStarted);
        assert_eq!(state.phase, Phase::Violation);
        assert_eq!(state.violation_count, 1);

        for _ in 0..10 {
            assert_eq!(state.apply(tick(60)), Outcome::Updated);
        }
        state.apply(SessionInput::ViolationCleared);

        assert_eq!(state.phase, Phase::Focusing);
        assert_eq!(state.remaining, before);
    }

    #[test]
    fn test_stray_events_ignored() {
        let mut idle = SessionState::new();
        assert_eq!(idle.apply(SessionInput::ViolationCleared), Outcome::Ignored);
        assert_eq!(idle.apply(SessionInput::ViolationStarted), Outcome::Ignored);
        assert_eq!(idle.apply(tick(5)), Outcome::Ignored);
        assert_eq!(idle.apply(SessionInput::Abort), Outcome::Ignored);
        assert_eq!(idle.violation_count, 0);

        let mut violating = focusing(10);
        violating.apply(SessionInput::ViolationStarted);
        assert_eq!(
            violating.apply(SessionInput::ViolationStarted),
            Outcome::Ignored
        );
        assert_eq!(violating.violation_count, 1);
    }

    #[test]
    fn test_monitoring_lost_keeps_focusing() {
        let mut state = focusing(10);
        let outcome = state.apply(SessionInput::MonitoringLost {
            reason: "camera unplugged".into(),
        });
        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(state.phase, Phase::Focusing);
        assert!(state.monitoring.is_degraded());
    }

    #[test]
    fn test_monitoring_lost_during_violation_resumes_clock() {
        let mut state = focusing(10);
        state.apply(SessionInput::ViolationStarted);
        state.apply(SessionInput::MonitoringLost {
            reason: "end of stream".into(),
        });
        assert_eq!(state.phase, Phase::Focusing);
        assert!(state.monitoring.is_degraded());
        assert_eq!(state.violation_count, 1);
    }

    #[test]
    fn test_skip_to_break_and_acknowledge() {
        let mut state = focusing(30);
        state.apply(SessionInput::ViolationStarted);
        state.apply(SessionInput::SkipToBreak);
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining, Duration::ZERO);
        assert_eq!(state.violation_count, 1);

        assert_eq!(state.apply(tick(1)), Outcome::Updated);
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining, Duration::ZERO);
        state.apply(SessionInput::Acknowledge);
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_abort_from_any_active_phase() {
        for setup in [
            vec![],
            vec![SessionInput::ViolationStarted],
            vec![SessionInput::SkipToBreak],
        ] {
            let mut state = focusing(15);
            for input in setup {
                state.apply(input);
            }
            let from = state.phase;
            assert_eq!(
                state.apply(SessionInput::Abort),
                Outcome::PhaseChanged {
                    from,
                    to: Phase::Idle
                }
            );
            assert_eq!(state, SessionState::default());
        }
    }
}
