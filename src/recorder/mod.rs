//! Recording system module
//!
//! Chunked per-camera recording:
//! - VideoSink/SinkFactory contract and the FFmpeg sink
//! - RecordingSession, the per-camera chunk/session state machine
//! - SessionRegistry to start, stop and feed all cameras' sessions

pub mod clock;
pub mod ffmpeg;
pub mod naming;
pub mod registry;
pub mod session;
pub mod sink;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ffmpeg::{ffmpeg_available, FfmpegSink, FfmpegSinkFactory};
pub use registry::SessionRegistry;
pub use session::RecordingSession;
pub use sink::{SinkError, SinkFactory, SinkResult, SinkSpec, VideoCodec, VideoSink};
pub use state::{
    RecordingEvent, SessionConfig, SessionSnapshot, SessionState, StopReason,
    DEFAULT_CHUNK_MINUTES, DEFAULT_FRAME_RATE, DEFAULT_MAX_SESSION_MINUTES,
};
