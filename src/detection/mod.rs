/// Detection module
///
/// The classifier contract the sentinel depends on, plus the detectors that
/// ship with the crate.
///
/// ## Architecture
///
/// ```text
/// Sentinel worker
///   ├── FrameSource (camera / image sequence)
///   └── Detector (classification)
///       └── RecordedDetector
/// ```
///
/// Any model can be plugged in by implementing [`Detector`]; tests drive the
/// sentinel with scripted fakes instead of real inference.

pub mod detector;
pub mod recorded;

// Re-export commonly used types
pub use detector::{shared, BoundingBox, Detection, Detector, SharedDetector};
pub use recorded::RecordedDetector;
