/// Session runner
///
/// Single-threaded event loop around a [`SessionController`]. User
/// commands, clock ticks and sentinel messages are multiplexed with
/// `select!` so the controller sees them one at a time, in arrival order.
use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use std::time::Instant;

use super::SessionController;
use crate::config::AppConfig;
use crate::messaging::Command;

pub struct SessionRunner {
    controller: SessionController,
    app_config: AppConfig,
    commands: Receiver<Command>,
    command_tx: Sender<Command>,
}

impl SessionRunner {
    pub fn new(controller: SessionController, app_config: AppConfig) -> Self {
        let (command_tx, commands) = unbounded();
        Self {
            controller,
            app_config,
            commands,
            command_tx,
        }
    }

    /// Sender for presentation-layer commands
    pub fn sender(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Run until [`Command::Quit`] arrives or every command sender is gone.
    ///
    /// Any running session is aborted on the way out.
    pub fn run(self) {
        let Self {
            mut controller,
            app_config,
            commands,
            command_tx,
        } = self;
        // Only external senders keep the loop alive
        drop(command_tx);

        let ticker = tick(app_config.tick_interval());
        let mut last_tick = Instant::now();

        tracing::info!(
            tick_ms = app_config.tick_interval_ms,
            "Session runner started"
        );

        let mut running = true;
        while running {
            let sentinel_events = controller.sentinel_events();

            select! {
                recv(commands) -> command => match command {
                    Ok(command) => {
                        tracing::debug!("Command: {}", command.description());
                        running = apply_command(&mut controller, &app_config, command, &mut last_tick);
                    }
                    Err(_) => {
                        tracing::info!("Command channel closed");
                        running = false;
                    }
                },
                recv(ticker) -> now => {
                    let now = now.unwrap_or_else(|_| Instant::now());
                    let elapsed = now.saturating_duration_since(last_tick);
                    last_tick = now;
                    controller.tick(elapsed);
                }
                recv(sentinel_events) -> message => match message {
                    Ok(message) => controller.handle_sentinel(message),
                    Err(_) => controller.sentinel_disconnected(),
                },
            }
        }

        tracing::info!("Session runner stopping");
        controller.shutdown();
    }
}

/// Returns false once the runner should stop
fn apply_command(
    controller: &mut SessionController,
    app_config: &AppConfig,
    command: Command,
    last_tick: &mut Instant,
) -> bool {
    match command {
        Command::Start { minutes } => {
            // A rejection is already logged and published
            if controller.start(app_config.session_config(minutes)).is_ok() {
                *last_tick = Instant::now();
            }
        }
        Command::AcknowledgeBreak => controller.acknowledge_break(),
        Command::Abort => controller.abort(),
        Command::SkipToBreak => controller.skip_to_break(),
        Command::Quit => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Frame, FrameSource, FrameSourceProvider};
    use crate::detection::{shared, Detection, Detector};
    use crate::error::{DetectorError, FrameSourceError};
    use crate::messaging::{EventBus, SessionEvent};
    use crate::state::Phase;
    use image::RgbImage;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct Nothing;

    impl Detector for Nothing {
        fn classify(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "Nothing"
        }
    }

    struct Blank;

    impl FrameSource for Blank {
        fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
            Ok(Frame::new(0, RgbImage::new(1, 1)))
        }
    }

    fn runner(tick_interval_ms: u64) -> SessionRunner {
        let frames: Arc<dyn FrameSourceProvider> =
            Arc::new(|| -> Result<Box<dyn FrameSource>, FrameSourceError> { Ok(Box::new(Blank)) });
        let app_config = AppConfig {
            tick_interval_ms,
            sample_interval_ms: 5,
            ..AppConfig::default()
        };
        let controller = SessionController::new(shared(Nothing), frames, EventBus::new())
            .with_sample_interval(app_config.sample_interval());
        SessionRunner::new(controller, app_config)
    }

    fn wait_for<F>(events: &Receiver<SessionEvent>, mut pred: F) -> SessionEvent
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = events
                .recv_timeout(remaining)
                .expect("event not received in time");
            if pred(&event) {
                return event;
            }
        }
    }

    #[test]
    fn test_commands_drive_session() {
        let runner = runner(10);
        let (events, _id) = runner.controller().subscribe();
        let commands = runner.sender();
        let handle = thread::spawn(move || runner.run());

        commands.send(Command::Start { minutes: 5 }).unwrap();
        let started = wait_for(&events, |e| matches!(e, SessionEvent::PhaseChanged { .. }));
        assert_eq!(started.snapshot().unwrap().phase, Phase::Focusing);

        let ticked = wait_for(&events, |e| matches!(e, SessionEvent::Tick { .. }));
        let snapshot = ticked.snapshot().unwrap();
        assert_eq!(snapshot.phase, Phase::Focusing);
        assert!(snapshot.remaining <= Duration::from_secs(300));

        commands.send(Command::SkipToBreak).unwrap();
        let on_break = wait_for(&events, |e| matches!(e, SessionEvent::PhaseChanged { .. }));
        assert_eq!(on_break.snapshot().unwrap().phase, Phase::Break);

        commands.send(Command::AcknowledgeBreak).unwrap();
        let idle = wait_for(&events, |e| matches!(e, SessionEvent::PhaseChanged { .. }));
        assert_eq!(idle.snapshot().unwrap().phase, Phase::Idle);

        commands.send(Command::Quit).unwrap();
        handle.join().unwrap();
        wait_for(&events, |e| matches!(e, SessionEvent::Shutdown));
    }

    #[test]
    fn test_invalid_start_is_rejected() {
        let runner = runner(1000);
        let (events, _id) = runner.controller().subscribe();
        let commands = runner.sender();
        let handle = thread::spawn(move || runner.run());

        commands.send(Command::Start { minutes: 1 }).unwrap();
        let rejected = wait_for(&events, |e| {
            matches!(e, SessionEvent::StartRejected { .. } | SessionEvent::PhaseChanged { .. })
        });
        assert!(matches!(rejected, SessionEvent::StartRejected { .. }));

        commands.send(Command::Quit).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_dropping_senders_stops_runner() {
        let runner = runner(1000);
        let (events, _id) = runner.controller().subscribe();
        let commands = runner.sender();
        let handle = thread::spawn(move || runner.run());

        commands.send(Command::Start { minutes: 30 }).unwrap();
        drop(commands);
        handle.join().unwrap();

        let last = events.try_iter().last();
        assert!(matches!(last, Some(SessionEvent::Shutdown)));
    }
}
