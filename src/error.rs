use thiserror::Error;

/// Domain errors for the focus session core.
///
/// Library code returns these; the binary wraps them with `anyhow` context.

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid focus duration: {minutes} min (must be {min}-{max} min)")]
    InvalidDuration { minutes: u64, min: u64, max: u64 },

    #[error("Invalid confidence threshold: {0} (must be 0.0-1.0)")]
    InvalidThreshold(f32),

    #[error("Invalid debounce: {0} frames (must be at least 1)")]
    InvalidDebounce(u32),

    #[error("No target labels configured")]
    NoTargetLabels,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to load detection model: {0}")]
    ModelLoadFailed(String),

    #[error("Classification failed on frame {frame}")]
    ClassificationFailed {
        frame: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Frame source reached end of stream")]
    EndOfStream,

    #[error("Failed to decode frame {path}")]
    DecodeFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Failed to start sentinel thread")]
    ThreadSpawnFailed(#[source] std::io::Error),

    #[error("Sentinel thread panicked")]
    WorkerPanicked,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
