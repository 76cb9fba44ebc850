/// Detector trait and common types
///
/// Defines the contract for the object classifier that watches camera frames.
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::capture::Frame;
use crate::error::DetectorError;

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// One classifier output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Confidence level (0.0-1.0)
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Detector trait
///
/// Wraps a pretrained object classifier. Calls are synchronous and may take
/// tens of milliseconds; the sentinel only invokes them from its worker thread.
pub trait Detector: Send {
    /// Classify one frame, returning every object the model saw
    fn classify(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;

    /// Get detector name (for logging)
    fn name(&self) -> &'static str;
}

/// Detector shared between sessions so the model is loaded only once
pub type SharedDetector = Arc<Mutex<Box<dyn Detector>>>;

pub fn shared(detector: impl Detector + 'static) -> SharedDetector {
    Arc::new(Mutex::new(Box::new(detector)))
}
