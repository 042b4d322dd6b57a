//! Camera capture
//!
//! Frame types, camera sources, discovery, and the per-camera capture loop.

pub mod discovery;
pub mod poller;
pub mod test_pattern;
pub mod traits;

#[cfg(feature = "native-camera")]
pub mod webcam;

pub use discovery::find_available_cameras;
pub use poller::{CapturePoller, PollerStats, DEFAULT_POLL_INTERVAL};
pub use test_pattern::TestPatternSource;
pub use traits::{
    CameraInfo, CameraSource, CaptureError, CaptureResult, Frame, PixelFormat, Resolution,
};

#[cfg(feature = "native-camera")]
pub use webcam::WebcamSource;
