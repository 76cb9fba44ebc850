/// Sentinel
///
/// Turns the noisy per-frame classifier signal into a stable, low-frequency
/// stream of violation events.
///
/// ## Architecture
///
/// ```text
/// FrameSource ──frame──> Sentinel::poll ──> Detector::classify
///                              │
///                              ├── threshold + label filter (best match per frame)
///                              └── streak debounce ──> DetectionEvent
/// ```
///
/// [`Sentinel`] is the pure filtering stage. [`SentinelHandle`] runs it on a
/// dedicated worker thread that owns the camera.

pub mod worker;

use std::collections::BTreeSet;

use crate::capture::Frame;
use crate::config::SessionConfig;
use crate::detection::{Detection, SharedDetector};
use crate::error::FrameSourceError;

pub use worker::{SentinelHandle, SentinelMessage};

/// Raw detections above this confidence are traced even if they are not targets
const SIGHTING_FLOOR: f32 = 0.2;

/// Output of one sentinel sample
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionEvent {
    /// Target object held for `debounce_frames` consecutive frames
    ViolationStarted { detection: Detection },

    /// Target object absent for `debounce_frames` consecutive frames
    ViolationCleared,

    NoChange,
}

impl DetectionEvent {
    pub fn description(&self) -> String {
        match self {
            DetectionEvent::ViolationStarted { detection } => format!(
                "Violation started: {} ({:.2})",
                detection.label, detection.confidence
            ),
            DetectionEvent::ViolationCleared => "Violation cleared".to_string(),
            DetectionEvent::NoChange => "No change".to_string(),
        }
    }
}

/// Why the sentinel stopped watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CameraUnavailable,
    EndOfStream,
}

/// Monitoring ended unexpectedly; reported upward instead of a detection event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SentinelFailure {
    pub fn from_source_error(err: &FrameSourceError) -> Self {
        let kind = match err {
            FrameSourceError::EndOfStream => FailureKind::EndOfStream,
            _ => FailureKind::CameraUnavailable,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Counters reported when a sentinel stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentinelStats {
    pub frames: u64,
    pub positive_frames: u64,
    pub detector_failures: u64,
    pub violations: u64,
}

/// Confidence filter plus streak debounce over one detector
pub struct Sentinel {
    detector: SharedDetector,
    target_labels: BTreeSet<String>,
    confidence_threshold: f32,
    debounce_frames: u32,
    violating: bool,
    positive_streak: u32,
    negative_streak: u32,
    stats: SentinelStats,
}

impl Sentinel {
    pub fn new(detector: SharedDetector, config: &SessionConfig) -> Self {
        Self {
            detector,
            target_labels: config.target_labels.clone(),
            confidence_threshold: config.confidence_threshold,
            debounce_frames: config.debounce_frames.max(1),
            violating: false,
            positive_streak: 0,
            negative_streak: 0,
            stats: SentinelStats::default(),
        }
    }

    /// Classify one frame and advance the debounce state.
    ///
    /// A detector error counts as a frame with no detection.
    pub fn poll(&mut self, frame: &Frame) -> DetectionEvent {
        let result = {
            let mut detector = self.detector.lock();
            detector.classify(frame).map_err(|err| (detector.name(), err))
        };
        tracing::trace!(
            frame = frame.index,
            width = frame.width(),
            height = frame.height(),
            latency_ms = frame.captured_at.elapsed().as_millis() as u64,
            "Frame classified"
        );

        let matched = match result {
            Ok(detections) => self.best_match(&detections),
            Err((name, err)) => {
                self.stats.detector_failures += 1;
                tracing::warn!(
                    frame = frame.index,
                    detector = name,
                    violating = self.violating,
                    "Detector failed, counting frame as negative: {}",
                    err
                );
                None
            }
        };

        self.observe(matched)
    }

    /// Advance the debounce state with an already filtered sample
    pub fn observe(&mut self, matched: Option<Detection>) -> DetectionEvent {
        self.stats.frames += 1;

        match matched {
            Some(detection) => {
                self.stats.positive_frames += 1;
                self.positive_streak = self.positive_streak.saturating_add(1);
                self.negative_streak = 0;

                if !self.violating && self.positive_streak >= self.debounce_frames {
                    self.violating = true;
                    self.stats.violations += 1;
                    tracing::info!(
                        label = %detection.label,
                        confidence = detection.confidence,
                        area = detection.bbox.area(),
                        streak = self.positive_streak,
                        "Violation confirmed"
                    );
                    return DetectionEvent::ViolationStarted { detection };
                }
            }
            None => {
                self.negative_streak = self.negative_streak.saturating_add(1);
                self.positive_streak = 0;

                if self.violating && self.negative_streak >= self.debounce_frames {
                    self.violating = false;
                    tracing::info!(streak = self.negative_streak, "Violation cleared");
                    return DetectionEvent::ViolationCleared;
                }
            }
        }

        DetectionEvent::NoChange
    }

    /// Highest-confidence target detection above the threshold
    fn best_match(&self, detections: &[Detection]) -> Option<Detection> {
        for detection in detections {
            if detection.confidence > SIGHTING_FLOOR {
                tracing::debug!("Saw: {} ({:.2})", detection.label, detection.confidence);
            }
        }

        detections
            .iter()
            .filter(|d| d.confidence > self.confidence_threshold)
            .filter(|d| self.target_labels.contains(&d.label))
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .cloned()
    }

    pub fn is_violating(&self) -> bool {
        self.violating
    }

    pub fn stats(&self) -> SentinelStats {
        self.stats
    }
}
