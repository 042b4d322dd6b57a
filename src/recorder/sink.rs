//! Video sink contract
//!
//! A sink is one open output file bound to fixed dimensions, codec and frame
//! rate. Recording sessions own at most one at a time and open them through a
//! [`SinkFactory`].

use crate::capture::{Frame, PixelFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sink-related errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Sink is closed")]
    Closed,
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Encoding used for every chunk of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// MPEG-4 Part 2 ("mp4v" fourcc) in an MP4 container
    #[default]
    Mp4v,
    /// H.264 in an MP4 container
    H264,
    /// Motion JPEG in an AVI container
    Mjpeg,
}

impl VideoCodec {
    /// File extension of the container this codec is written into
    pub fn extension(&self) -> &'static str {
        match self {
            VideoCodec::Mp4v | VideoCodec::H264 => "mp4",
            VideoCodec::Mjpeg => "avi",
        }
    }

    /// FFmpeg encoder name
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            VideoCodec::Mp4v => "mpeg4",
            VideoCodec::H264 => "libx264",
            VideoCodec::Mjpeg => "mjpeg",
        }
    }
}

/// Everything needed to open one sink
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub codec: VideoCodec,
    pub frame_rate: f64,
}

/// One open chunk file
pub trait VideoSink: Send {
    /// Append a frame whose dimensions match the ones the sink was opened with
    fn append(&mut self, frame: &Frame) -> SinkResult<()>;

    /// Flush and release the file. Safe to call more than once; never fails.
    fn close(&mut self);

    /// Output file of this sink
    fn path(&self) -> &Path;

    /// Width and height fixed at open time
    fn dimensions(&self) -> (u32, u32);

    /// Frames appended so far
    fn frames_written(&self) -> u64;
}

/// Opens sinks for a recording session
pub trait SinkFactory: Send + Sync {
    fn open(&self, spec: &SinkSpec) -> SinkResult<Box<dyn VideoSink>>;
}
