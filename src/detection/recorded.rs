/// Replay detector
///
/// Serves detections recorded earlier (for example by running a model offline
/// over a clip) keyed by frame index. Frames with no entry produce nothing.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::detector::{Detection, Detector};
use crate::capture::Frame;
use crate::error::DetectorError;

#[derive(Debug, Default, Deserialize)]
struct Recording {
    #[serde(default)]
    frames: BTreeMap<u64, Vec<Detection>>,
}

#[derive(Debug, Default)]
pub struct RecordedDetector {
    frames: BTreeMap<u64, Vec<Detection>>,
}

impl RecordedDetector {
    /// Parse a recording of the form `{"frames": {"0": [detection, ...], ...}}`
    pub fn from_json_str(json: &str) -> Result<Self, DetectorError> {
        let recording: Recording = serde_json::from_str(json)
            .map_err(|e| DetectorError::ModelLoadFailed(e.to_string()))?;
        Ok(Self {
            frames: recording.frames,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, DetectorError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DetectorError::ModelLoadFailed(format!("{}: {}", path.display(), e)))?;
        let detector = Self::from_json_str(&json)?;
        tracing::info!(
            "Loaded recorded detections for {} frames from {}",
            detector.frames.len(),
            path.display()
        );
        Ok(detector)
    }

    pub fn recorded_frames(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for RecordedDetector {
    fn classify(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        Ok(self.frames.get(&frame.index).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "RecordedDetector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const RECORDING: &str = r#"{
        "frames": {
            "1": [
                {"label": "cell phone", "confidence": 0.62, "bbox": {"x1": 10, "y1": 10, "x2": 40, "y2": 90}},
                {"label": "person", "confidence": 0.91, "bbox": {"x1": 0, "y1": 0, "x2": 200, "y2": 200}}
            ]
        }
    }"#;

    #[test]
    fn test_replays_recorded_frame() {
        let mut detector = RecordedDetector::from_json_str(RECORDING).unwrap();
        assert_eq!(detector.recorded_frames(), 1);

        let detections = detector.classify(&Frame::new(1, RgbImage::new(1, 1))).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "cell phone");
    }

    #[test]
    fn test_unrecorded_frame_is_empty() {
        let mut detector = RecordedDetector::from_json_str(RECORDING).unwrap();
        let detections = detector.classify(&Frame::new(7, RgbImage::new(1, 1))).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_malformed_recording_is_rejected() {
        assert!(matches!(
            RecordedDetector::from_json_str("{ not json"),
            Err(DetectorError::ModelLoadFailed(_))
        ));
    }
}
