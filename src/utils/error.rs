//! Error types and handling
//!
//! Common error types used across the crate.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::recorder::SinkError;
use crate::settings::SettingsError;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(String),
}

impl AppError {
    /// Stable code for log lines and exit reports
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Settings(_) => "SETTINGS_ERROR",
            AppError::Sink(_) => "SINK_ERROR",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Recording(_) => "RECORDING_ERROR",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
