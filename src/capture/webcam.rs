//! Webcam capture using nokhwa
//!
//! Frames are decoded to packed RGB before they reach the recorder.

use super::traits::{CameraSource, CaptureError, CaptureResult, Frame, PixelFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// An open webcam stream
pub struct WebcamSource {
    index: u32,
    camera: Camera,
}

impl WebcamSource {
    /// Open the device at `index` and start streaming
    pub fn open(index: u32) -> CaptureResult<Self> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .map_err(|e| CaptureError::DeviceNotFound(format!("{}: {:?}", index, e)))?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {:?}", index, e)))?;

        let camera_format = camera.camera_format();
        tracing::debug!(
            "Webcam {} opened: {}x{} @ {}fps ({:?})",
            index,
            camera_format.resolution().width(),
            camera_format.resolution().height(),
            camera_format.frame_rate(),
            camera_format.format()
        );

        Ok(Self { index, camera })
    }
}

impl CameraSource for WebcamSource {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::FrameFailed(format!("{:?}", e)))?;

        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::FrameFailed(format!("decode: {:?}", e)))?;

        let (width, height) = (image.width(), image.height());
        Ok(Some(Frame::new(
            image.into_raw(),
            width,
            height,
            PixelFormat::Rgb24,
        )))
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Error stopping webcam {}: {:?}", self.index, e);
        }
    }
}
