//! Persistent recorder settings
//!
//! Settings live in a flat JSON file. It is read once at startup and only
//! written back when [`Settings::save`] is called.

use crate::recorder::{
    SessionConfig, VideoCodec, DEFAULT_CHUNK_MINUTES, DEFAULT_FRAME_RATE,
    DEFAULT_MAX_SESSION_MINUTES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV: &str = "MULTICAM_SETTINGS";

/// Settings file used when [`SETTINGS_ENV`] is unset
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Longest session the settings accept, in minutes
pub const MAX_SESSION_LIMIT: u32 = 60;

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory chunk files are written to
    pub save_path: PathBuf,

    /// Chunk length in minutes
    pub record_chunk_minutes: u32,

    /// Session cap in minutes
    pub max_record_minutes: u32,

    /// Display labels by camera slot
    pub camera_labels: Vec<String>,

    /// Device indices probed during discovery
    pub max_scan: u32,

    /// Delay between capture polls
    pub poll_interval_ms: u64,

    pub frame_rate: f64,

    pub codec: VideoCodec,

    /// Test-pattern cameras added next to real devices
    pub simulated_cameras: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("recordings"),
            record_chunk_minutes: DEFAULT_CHUNK_MINUTES,
            max_record_minutes: DEFAULT_MAX_SESSION_MINUTES,
            camera_labels: Vec::new(),
            max_scan: 8,
            poll_interval_ms: 30,
            frame_rate: DEFAULT_FRAME_RATE,
            codec: VideoCodec::default(),
            simulated_cameras: 0,
        }
    }
}

/// Settings file location, honouring [`SETTINGS_ENV`]
pub fn settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

impl Settings {
    /// Read settings from `path`, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;

        tracing::debug!("Loaded settings from {:?}", path);

        Ok(settings.clamped())
    }

    /// Write settings to `path` as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        tracing::debug!("Saved settings to {:?}", path);

        Ok(())
    }

    /// Bring numeric fields into their accepted ranges
    pub fn clamped(mut self) -> Self {
        self.record_chunk_minutes = self.record_chunk_minutes.max(1);
        self.max_record_minutes = self.max_record_minutes.clamp(1, MAX_SESSION_LIMIT);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            self.frame_rate = DEFAULT_FRAME_RATE;
        }
        self
    }

    /// Configuration shared by every session of a run
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(
            self.save_path.clone(),
            self.record_chunk_minutes,
            self.max_record_minutes,
        )
        .with_codec(self.codec)
        .with_frame_rate(self.frame_rate)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Label for the camera in `slot`, or `Camera <id>` when none is saved
    pub fn label_for(&self, slot: usize, camera_id: &str) -> String {
        match self.camera_labels.get(slot).map(|label| label.trim()) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("Camera {}", camera_id),
        }
    }

    /// Replace labels from comma-separated text
    pub fn set_labels_from_csv(&mut self, text: &str) {
        self.camera_labels = text
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
    }
}
