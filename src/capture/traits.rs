//! Capture trait definitions
//!
//! Platform-agnostic types for camera sources and the frames they produce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by camera sources
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to read frame: {0}")]
    FrameFailed(String),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Layout of the pixel buffer carried by a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed blue, green, red (what most capture stacks hand out)
    Bgr24,
    /// Packed red, green, blue
    Rgb24,
    /// Packed red, green, blue, alpha
    Rgba,
}

impl PixelFormat {
    /// Bytes used by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgr24 | PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// FFmpeg `-pixel_format` name for raw input in this layout
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgba => "rgba",
        }
    }
}

/// One raw video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel buffer, row-major, no padding between rows
    pub data: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Layout of `data`
    pub format: PixelFormat,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Buffer length a frame of these dimensions must have
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Whether the buffer length agrees with the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A source of raw frames, polled by the capture loop
///
/// `next_frame` returns `Ok(None)` when the device is open but has no frame
/// ready; errors are reported per call and do not close the source. Sources
/// are opened on the thread that polls them, so they need not be `Send`.
pub trait CameraSource {
    /// Pull the next frame
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>>;
}

impl<S: CameraSource + ?Sized> CameraSource for Box<S> {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Display label
    pub name: String,

    /// Resolution of the probe frame
    pub resolution: Resolution,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}
