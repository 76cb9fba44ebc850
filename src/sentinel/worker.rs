/// Sentinel worker thread
///
/// Owns the frame source for the lifetime of one session and forwards
/// committed detection events to the controller over a channel.
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{DetectionEvent, Sentinel, SentinelFailure, SentinelStats};
use crate::capture::{FrameSource, FrameSourceProvider};
use crate::error::{FrameSourceError, SentinelError};

/// Longest single sleep while pacing, so a stop request is seen promptly
const STOP_POLL_SLICE: Duration = Duration::from_millis(20);

/// Message from the worker to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum SentinelMessage {
    /// A committed change; `NoChange` samples are not forwarded
    Detection(DetectionEvent),

    /// The frame source gave out; the worker has exited
    Failure(SentinelFailure),
}

/// Running sentinel worker.
///
/// Dropping the handle stops the worker and waits for it to release the
/// camera.
pub struct SentinelHandle {
    stop: Arc<AtomicBool>,
    events: Receiver<SentinelMessage>,
    thread: Option<JoinHandle<SentinelStats>>,
}

impl SentinelHandle {
    /// Start sampling on a new thread
    pub fn spawn(
        provider: Arc<dyn FrameSourceProvider>,
        sentinel: Sentinel,
        sample_interval: Duration,
    ) -> Result<Self, SentinelError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("sentinel".to_string())
            .spawn(move || {
                let mut sentinel = sentinel;
                let source = match provider.open() {
                    Ok(source) => source,
                    Err(err) => {
                        tracing::error!("Sentinel could not open frame source: {}", err);
                        let _ = tx.send(SentinelMessage::Failure(
                            SentinelFailure::from_source_error(&err),
                        ));
                        return sentinel.stats();
                    }
                };
                sampling_loop(source, &mut sentinel, sample_interval, &stop_flag, &tx);
                sentinel.stats()
            })
            .map_err(SentinelError::ThreadSpawnFailed)?;

        Ok(Self {
            stop,
            events: rx,
            thread: Some(thread),
        })
    }

    /// Receiver for worker messages, in emission order
    pub fn events(&self) -> &Receiver<SentinelMessage> {
        &self.events
    }

    /// Request a stop and wait for the worker to exit
    pub fn stop(mut self) -> Result<SentinelStats, SentinelError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<SentinelStats, SentinelError> {
        self.stop.store(true, Ordering::Release);

        let Some(thread) = self.thread.take() else {
            return Ok(SentinelStats::default());
        };

        let stats = thread.join().map_err(|_| SentinelError::WorkerPanicked)?;
        tracing::info!(
            frames = stats.frames,
            positives = stats.positive_frames,
            detector_failures = stats.detector_failures,
            violations = stats.violations,
            "Sentinel stopped"
        );
        Ok(stats)
    }
}

impl Drop for SentinelHandle {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!("Sentinel shutdown failed: {}", err);
        }
    }
}

fn sampling_loop(
    mut source: Box<dyn FrameSource>,
    sentinel: &mut Sentinel,
    sample_interval: Duration,
    stop: &AtomicBool,
    tx: &Sender<SentinelMessage>,
) {
    tracing::info!("Sentinel active on {}", source.name());

    while !stop.load(Ordering::Acquire) {
        let sample_start = Instant::now();

        let event = match source.next_frame() {
            Ok(frame) => {
                // Acquisition can block for a while; don't classify after a stop request
                if stop.load(Ordering::Acquire) {
                    break;
                }
                sentinel.poll(&frame)
            }
            Err(FrameSourceError::DecodeFailed { path, source: err }) => {
                tracing::warn!("Skipping undecodable frame {}: {}", path, err);
                sentinel.observe(None)
            }
            Err(err) => {
                let failure = SentinelFailure::from_source_error(&err);
                tracing::error!(
                    kind = ?failure.kind,
                    violating = sentinel.is_violating(),
                    "Sentinel lost its frame source: {}",
                    err
                );
                let _ = tx.send(SentinelMessage::Failure(failure));
                break;
            }
        };

        if event != DetectionEvent::NoChange {
            tracing::debug!("Sentinel event: {}", event.description());
            if tx.send(SentinelMessage::Detection(event)).is_err() {
                tracing::debug!("Sentinel receiver dropped, stopping");
                break;
            }
        }

        pace(sample_start, sample_interval, stop);
    }

    tracing::debug!("Sentinel releasing {}", source.name());
}

/// Sleep out the rest of the sample interval, waking early on stop
fn pace(sample_start: Instant, sample_interval: Duration, stop: &AtomicBool) {
    let deadline = sample_start + sample_interval;
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(STOP_POLL_SLICE));
    }
}
