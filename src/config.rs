use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const MIN_FOCUS_MINUTES: u64 = 5;
pub const MAX_FOCUS_MINUTES: u64 = 120;
pub const DEFAULT_FOCUS_MINUTES: u64 = 45;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_DEBOUNCE_FRAMES: u32 = 3;

/// COCO class name for a handheld phone
pub const PHONE_LABEL: &str = "cell phone";

/// Settings for one focus session. Fixed once the session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub focus_duration: Duration,
    pub target_labels: BTreeSet<String>,
    pub confidence_threshold: f32,
    /// Consecutive agreeing samples needed to start or clear a violation
    pub debounce_frames: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::with_minutes(DEFAULT_FOCUS_MINUTES)
    }
}

impl SessionConfig {
    /// Default session settings with the given focus length
    pub fn with_minutes(minutes: u64) -> Self {
        Self {
            focus_duration: Duration::from_secs(minutes.saturating_mul(60)),
            target_labels: BTreeSet::from([PHONE_LABEL.to_string()]),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            debounce_frames: DEFAULT_DEBOUNCE_FRAMES,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_debounce(mut self, frames: u32) -> Self {
        self.debounce_frames = frames;
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = Duration::from_secs(MIN_FOCUS_MINUTES * 60);
        let max = Duration::from_secs(MAX_FOCUS_MINUTES * 60);
        if self.focus_duration < min || self.focus_duration > max {
            return Err(ConfigError::InvalidDuration {
                minutes: self.focus_duration.as_secs() / 60,
                min: MIN_FOCUS_MINUTES,
                max: MAX_FOCUS_MINUTES,
            });
        }

        if !self.confidence_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.confidence_threshold)
        {
            return Err(ConfigError::InvalidThreshold(self.confidence_threshold));
        }

        if self.debounce_frames == 0 {
            return Err(ConfigError::InvalidDebounce(self.debounce_frames));
        }

        if self.target_labels.is_empty() {
            return Err(ConfigError::NoTargetLabels);
        }

        Ok(())
    }
}

/// Persistent application settings.
///
/// Holds the defaults used to build a [`SessionConfig`] plus the runtime
/// pacing of the clock and the sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Focus length offered when no duration is given
    pub focus_minutes: u64,

    /// Detections at or below this confidence are ignored
    pub confidence_threshold: f32,

    /// Consecutive frames required before a violation starts or clears
    pub debounce_frames: u32,

    /// Detector labels that count as a violation
    pub target_labels: Vec<String>,

    /// Minimum time between two sentinel samples
    pub sample_interval_ms: u64,

    /// Clock tick period
    pub tick_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            debounce_frames: DEFAULT_DEBOUNCE_FRAMES,
            target_labels: vec![PHONE_LABEL.to_string()],
            sample_interval_ms: 100,
            tick_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ZenFocus").join("config.json"))
    }

    /// Load from the default location, creating the file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()
            .ok_or_else(|| ConfigError::Invalid("no config directory on this platform".into()))?;

        if path.exists() {
            let config = Self::load_from(&path)?;
            tracing::info!("Loaded config from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            tracing::info!("Created default config at: {}", path.display());
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::LoadFailed {
                path: path.display().to_string(),
                source,
            }
        };

        let content = fs::read_to_string(path).map_err(|e| load_failed(Box::new(e)))?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|e| load_failed(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()
            .ok_or_else(|| ConfigError::Invalid("no config directory on this platform".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::SaveFailed {
                path: path.display().to_string(),
                source,
            }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        tracing::debug!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Check every field, including the session defaults
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sample_interval_ms must be greater than zero".into(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }
        self.session_config(self.focus_minutes).validate()
    }

    /// Session settings for a focus block of `minutes`, not yet validated
    pub fn session_config(&self, minutes: u64) -> SessionConfig {
        SessionConfig::with_minutes(minutes)
            .with_threshold(self.confidence_threshold)
            .with_debounce(self.debounce_frames)
            .with_labels(self.target_labels.iter().cloned())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
