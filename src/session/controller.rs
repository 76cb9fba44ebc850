/// Session controller
///
/// Owns the session state, starts and stops the sentinel worker, and
/// publishes a [`SessionEvent`] for every transition.
use crossbeam_channel::{never, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::FrameSourceProvider;
use crate::config::SessionConfig;
use crate::detection::SharedDetector;
use crate::error::ConfigError;
use crate::messaging::{EventBus, SessionEvent, SubscriberId};
use crate::sentinel::{DetectionEvent, Sentinel, SentinelFailure, SentinelHandle, SentinelMessage};
use crate::state::{Outcome, Phase, SessionInput, SessionState};

const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// One focus session at a time.
///
/// Not shared between threads: whoever owns the controller feeds it clock
/// ticks, user commands and sentinel messages one at a time. Several
/// controllers can coexist (one per test, for example); nothing is global.
pub struct SessionController {
    state: SessionState,
    config: Option<SessionConfig>,
    detector: SharedDetector,
    frames: Arc<dyn FrameSourceProvider>,
    sample_interval: Duration,
    sentinel: Option<SentinelHandle>,
    bus: EventBus,
}

impl SessionController {
    pub fn new(
        detector: SharedDetector,
        frames: Arc<dyn FrameSourceProvider>,
        bus: EventBus,
    ) -> Self {
        Self {
            state: SessionState::new(),
            config: None,
            detector,
            frames,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            sentinel: None,
            bus,
        }
    }

    /// Minimum spacing between sentinel samples
    pub fn with_sample_interval(mut self, sample_interval: Duration) -> Self {
        self.sample_interval = sample_interval;
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Settings of the running session
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn subscribe(&self) -> (Receiver<SessionEvent>, SubscriberId) {
        self.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_monitoring(&self) -> bool {
        self.sentinel.is_some()
    }

    /// Messages from the running sentinel, or a channel that never fires
    pub fn sentinel_events(&self) -> Receiver<SentinelMessage> {
        self.sentinel
            .as_ref()
            .map(|handle| handle.events().clone())
            .unwrap_or_else(never)
    }

    /// Begin a focus session.
    ///
    /// Invalid settings are rejected even when a session is already running;
    /// a valid request outside `Idle` is ignored.
    pub fn start(&mut self, config: SessionConfig) -> Result<(), ConfigError> {
        if let Err(err) = config.validate() {
            tracing::warn!(phase = ?self.state.phase, "Refusing to start session: {}", err);
            self.bus.publish(SessionEvent::StartRejected {
                reason: err.to_string(),
            });
            return Err(err);
        }

        let outcome = self.state.apply(SessionInput::Start {
            focus_duration: config.focus_duration,
        });
        if outcome == Outcome::Ignored {
            tracing::debug!(phase = ?self.state.phase, "Start ignored, session already running");
            return Ok(());
        }

        tracing::info!(
            minutes = config.focus_duration.as_secs() / 60,
            threshold = config.confidence_threshold,
            debounce = config.debounce_frames,
            labels = ?config.target_labels,
            "Focus session started"
        );

        let sentinel = Sentinel::new(Arc::clone(&self.detector), &config);
        self.config = Some(config);
        self.publish_outcome(outcome, Phase::Idle);

        match SentinelHandle::spawn(Arc::clone(&self.frames), sentinel, self.sample_interval) {
            Ok(handle) => self.sentinel = Some(handle),
            Err(err) => {
                tracing::error!("Monitoring unavailable for this session: {}", err);
                self.monitoring_lost(err.to_string());
            }
        }

        Ok(())
    }

    /// Advance the countdown by `elapsed`. Only counts while Focusing.
    pub fn tick(&mut self, elapsed: Duration) {
        let from = self.state.phase;
        let outcome = self.state.apply(SessionInput::Tick { elapsed });

        if let Outcome::PhaseChanged { to: Phase::Break, .. } = outcome {
            tracing::info!(
                violations = self.state.violation_count,
                "Focus block complete"
            );
            self.stop_sentinel();
        }
        self.publish_outcome(outcome, from);
    }

    /// Apply a debounced detection event
    pub fn report(&mut self, event: DetectionEvent) {
        let input = match event {
            DetectionEvent::ViolationStarted { detection } => {
                tracing::info!(
                    label = %detection.label,
                    confidence = detection.confidence,
                    phase = ?self.state.phase,
                    "Violation reported"
                );
                SessionInput::ViolationStarted
            }
            DetectionEvent::ViolationCleared => SessionInput::ViolationCleared,
            DetectionEvent::NoChange => return,
        };

        self.apply(input);
    }

    /// Record that the sentinel can no longer watch the camera
    pub fn report_failure(&mut self, failure: SentinelFailure) {
        tracing::error!(
            kind = ?failure.kind,
            phase = ?self.state.phase,
            "Sentinel failure: {}",
            failure.message
        );
        self.stop_sentinel();
        self.monitoring_lost(failure.message);
    }

    pub fn handle_sentinel(&mut self, message: SentinelMessage) {
        match message {
            SentinelMessage::Detection(event) => self.report(event),
            SentinelMessage::Failure(failure) => self.report_failure(failure),
        }
    }

    /// The sentinel channel closed without a failure message
    pub fn sentinel_disconnected(&mut self) {
        if self.sentinel.take().is_some() {
            tracing::error!(phase = ?self.state.phase, "Sentinel exited unexpectedly");
            self.monitoring_lost("sentinel stopped unexpectedly".to_string());
        }
    }

    pub fn acknowledge_break(&mut self) {
        if self.apply(SessionInput::Acknowledge) {
            self.config = None;
        }
    }

    /// Jump to the break, stopping monitoring
    pub fn skip_to_break(&mut self) {
        if self.state.phase.is_active() {
            self.stop_sentinel();
        }
        self.apply(SessionInput::SkipToBreak);
    }

    /// End the session from any phase.
    ///
    /// The sentinel is stopped and joined before the state is reset, so the
    /// camera is released when this returns.
    pub fn abort(&mut self) {
        self.stop_sentinel();
        if self.apply(SessionInput::Abort) {
            tracing::info!("Session aborted");
            self.config = None;
        }
    }

    /// Abort any session and tell observers the controller is going away
    pub fn shutdown(mut self) {
        self.abort();
        self.bus.publish(SessionEvent::Shutdown);
    }

    fn monitoring_lost(&mut self, reason: String) {
        let from = self.state.phase;
        let outcome = self.state.apply(SessionInput::MonitoringLost {
            reason: reason.clone(),
        });
        if outcome == Outcome::Ignored {
            return;
        }

        self.bus.publish(SessionEvent::MonitoringDegraded {
            reason,
            snapshot: self.state.clone(),
        });
        if let Outcome::PhaseChanged { .. } = outcome {
            self.publish_outcome(outcome, from);
        }
    }

    /// Apply a user or sentinel input; true if the phase changed
    fn apply(&mut self, input: SessionInput) -> bool {
        let from = self.state.phase;
        let description = format!("{:?}", input);
        let outcome = self.state.apply(input);

        if outcome == Outcome::Ignored {
            tracing::debug!(phase = ?from, input = %description, "Input ignored");
            return false;
        }

        self.publish_outcome(outcome, from);
        matches!(outcome, Outcome::PhaseChanged { .. })
    }

    fn publish_outcome(&self, outcome: Outcome, from: Phase) {
        match outcome {
            Outcome::PhaseChanged { to, .. } => {
                tracing::info!(
                    from = ?from,
                    to = ?to,
                    remaining_secs = self.state.remaining.as_secs(),
                    violations = self.state.violation_count,
                    "Phase changed"
                );
                self.bus.publish(SessionEvent::PhaseChanged {
                    old_phase: from,
                    snapshot: self.state.clone(),
                    timestamp: Instant::now(),
                });
            }
            Outcome::Updated => self.bus.publish(SessionEvent::Tick {
                snapshot: self.state.clone(),
            }),
            Outcome::Ignored => {}
        }
    }

    fn stop_sentinel(&mut self) {
        let Some(handle) = self.sentinel.take() else {
            return;
        };
        if let Err(err) = handle.stop() {
            tracing::error!(phase = ?self.state.phase, "Failed to stop sentinel: {}", err);
        }
    }
}
