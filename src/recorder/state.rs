//! Recording state management
//!
//! Defines the per-camera session state machine, its configuration, and the
//! snapshots and events it reports.

use super::sink::VideoCodec;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default chunk length in minutes
pub const DEFAULT_CHUNK_MINUTES: u32 = 5;

/// Default session cap in minutes
pub const DEFAULT_MAX_SESSION_MINUTES: u32 = 60;

/// Default encoding frame rate
pub const DEFAULT_FRAME_RATE: f64 = 20.0;

/// State of one camera's recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Never started
    #[default]
    Idle,
    /// Writing frames or between chunks
    Active,
    /// Stopped by request or by the session cap; bookkeeping is reset
    Stopped,
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// The configured maximum session length was reached
    SessionLimit,
}

/// Configuration applied to every session of one recording run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Directory chunk files are written to
    pub output_dir: PathBuf,

    /// Chunk length in minutes (sessions clamp this to at least 1)
    pub chunk_minutes: u32,

    /// Maximum total recording time in minutes
    pub max_session_minutes: u32,

    /// Encoding used for every chunk
    #[serde(default)]
    pub codec: VideoCodec,

    /// Frame rate written into every chunk
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

impl SessionConfig {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        chunk_minutes: u32,
        max_session_minutes: u32,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            chunk_minutes,
            max_session_minutes,
            codec: VideoCodec::default(),
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }
}

/// Point-in-time view of a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub camera_id: String,

    pub state: SessionState,

    /// Effective chunk length after clamping
    pub chunk_minutes: u32,

    pub max_session_minutes: u32,

    pub session_started_at: Option<DateTime<Local>>,

    pub current_chunk_started_at: Option<DateTime<Local>>,

    /// Chunk-minutes committed at rotation events
    pub minutes_recorded: u32,

    /// File of the open sink; `None` until a chunk's first frame opens one
    pub current_chunk_path: Option<PathBuf>,

    /// Whether a sink is open right now
    pub sink_open: bool,

    /// Chunks that reached their full length
    pub chunks_completed: u64,

    pub frames_written: u64,

    /// Frames consumed while active but not written
    pub frames_dropped: u64,

    /// Sink open and append failures
    pub sink_errors: u64,

    /// Every chunk file closed by this session, oldest first
    pub output_files: Vec<PathBuf>,
}

/// Events emitted by recording sessions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// A session entered `Active`
    SessionStarted { camera_id: String },
    /// A chunk's sink was opened
    ChunkOpened { camera_id: String, path: PathBuf },
    /// A chunk's sink was closed
    ChunkClosed {
        camera_id: String,
        path: PathBuf,
        frames: u64,
    },
    /// A sink failed to open or to accept a frame
    SinkFailed { camera_id: String, error: String },
    /// A session entered `Stopped`
    SessionStopped {
        camera_id: String,
        reason: StopReason,
    },
}

impl RecordingEvent {
    pub fn camera_id(&self) -> &str {
        match self {
            RecordingEvent::SessionStarted { camera_id }
            | RecordingEvent::ChunkOpened { camera_id, .. }
            | RecordingEvent::ChunkClosed { camera_id, .. }
            | RecordingEvent::SinkFailed { camera_id, .. }
            | RecordingEvent::SessionStopped { camera_id, .. } => camera_id,
        }
    }
}
