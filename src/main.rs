use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use sysinfo::System;

use zenfocus::capture::{FrameSource, FrameSourceProvider, ImageSequenceSource};
use zenfocus::config::AppConfig;
use zenfocus::detection::{shared, RecordedDetector};
use zenfocus::error::{AppResult, FrameSourceError};
use zenfocus::messaging::{format_remaining, Command, EventBus, SessionEvent};
use zenfocus::session::{SessionController, SessionRunner};
use zenfocus::state::Phase;

const LOG_TARGET_STARTUP: &str = "zenfocus::startup";

#[derive(Parser, Debug)]
#[command(name = "zenfocus")]
#[command(about = "Focus timer that pauses while a phone is in view", long_about = None)]
struct Cli {
    /// Focus block length in minutes (5-120)
    #[arg(short, long)]
    minutes: Option<u64>,

    /// Directory of frames to replay as the camera
    #[arg(long)]
    frames: PathBuf,

    /// Recorded detections (JSON, keyed by frame index)
    #[arg(long)]
    detections: PathBuf,

    /// Minimum detection confidence (exclusive)
    #[arg(long)]
    threshold: Option<f32>,

    /// Consecutive frames needed to start or clear a violation
    #[arg(long)]
    debounce: Option<u32>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("ZenFocus").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "zenfocus.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    // Console output would interleave with the presenter in release builds
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting ZenFocus v{} on ({})",
        version,
        std::env::consts::ARCH
    );
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config")?,
    };

    if let Some(minutes) = cli.minutes {
        config.focus_minutes = minutes;
    }
    if let Some(threshold) = cli.threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(debounce) = cli.debounce {
        config.debounce_frames = debounce;
    }

    config.validate().context("Invalid settings")?;
    Ok(config)
}

/// Prints session events until the controller shuts down
fn run_presenter(events: Receiver<SessionEvent>) {
    let mut last_minute = None;
    for event in events {
        match &event {
            SessionEvent::PhaseChanged { snapshot, .. } => {
                println!("[{}] {}", format_remaining(snapshot.remaining), event.description());
                match snapshot.phase {
                    Phase::Focusing => println!("  (s = skip to break, q = abort, x = exit)"),
                    Phase::Break => println!("  Break time! Press 'a' to finish."),
                    Phase::Idle => println!("  Press 'n' for a new session, 'x' to exit."),
                    Phase::Violation => {}
                }
            }
            SessionEvent::Tick { snapshot } => {
                let minute = snapshot.remaining.as_secs() / 60;
                if last_minute.replace(minute) != Some(minute) {
                    println!(
                        "[{}] {}",
                        format_remaining(snapshot.remaining),
                        snapshot.phase.description()
                    );
                }
            }
            SessionEvent::MonitoringDegraded { .. } | SessionEvent::StartRejected { .. } => {
                println!("! {}", event.description());
            }
            SessionEvent::Shutdown => {
                println!("Goodbye.");
                break;
            }
        }
    }
}

/// Maps console keys to commands; end of input exits
fn read_commands(commands: Sender<Command>, minutes: u64) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = match line.trim() {
            "a" => Command::AcknowledgeBreak,
            "s" => Command::SkipToBreak,
            "q" => Command::Abort,
            "n" => Command::Start { minutes },
            "x" => Command::Quit,
            "" => continue,
            other => {
                println!("Unknown key '{}'", other);
                continue;
            }
        };
        if commands.send(command).is_err() {
            return;
        }
        if command == Command::Quit {
            return;
        }
    }
    let _ = commands.send(Command::Quit);
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    initialize_tracing();
    log_runtime_environment();

    let config = load_config(&cli)?;

    let detector = RecordedDetector::from_path(&cli.detections)
        .with_context(|| format!("Failed to load detections from {}", cli.detections.display()))?;
    if detector.recorded_frames() == 0 {
        tracing::warn!("Recording has no detections; no violation will ever be reported");
    }

    let frames_dir = cli.frames.clone();
    let frames: Arc<dyn FrameSourceProvider> =
        Arc::new(move || -> Result<Box<dyn FrameSource>, FrameSourceError> {
            Ok(Box::new(ImageSequenceSource::open(&frames_dir)?))
        });

    let controller = SessionController::new(shared(detector), frames, EventBus::new())
        .with_sample_interval(config.sample_interval());
    let (events, _subscription) = controller.subscribe();

    let minutes = config.focus_minutes;
    let runner = SessionRunner::new(controller, config);
    let commands = runner.sender();

    let presenter = thread::Builder::new()
        .name("presenter".to_string())
        .spawn(move || run_presenter(events))
        .context("Failed to spawn presenter thread")?;

    commands
        .send(Command::Start { minutes })
        .context("Command channel closed")?;

    // Not joined: a blocking stdin read cannot be interrupted
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || read_commands(commands, minutes))
        .context("Failed to spawn input thread")?;

    runner.run();

    if presenter.join().is_err() {
        tracing::error!("Presenter thread panicked");
    }
    Ok(())
}
