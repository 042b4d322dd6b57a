//! Camera discovery
//!
//! Probes a bounded range of device indices and keeps the ones that open and
//! deliver a frame right away.

use super::traits::{CameraInfo, CameraSource, CaptureResult, Resolution};

/// Probe device indices `0..max_scan`
///
/// `open` opens the device at an index. Each opened source is asked for one
/// frame and released before the next index is tried.
pub fn find_available_cameras<S, F>(max_scan: u32, mut open: F) -> Vec<CameraInfo>
where
    S: CameraSource,
    F: FnMut(u32) -> CaptureResult<S>,
{
    let mut available = Vec::new();

    for index in 0..max_scan {
        let mut source = match open(index) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!("No camera at index {}: {}", index, e);
                continue;
            }
        };

        match source.next_frame() {
            Ok(Some(frame)) => {
                tracing::info!(
                    "Found camera {} ({}x{})",
                    index,
                    frame.width,
                    frame.height
                );
                available.push(CameraInfo {
                    id: index.to_string(),
                    name: format!("Camera {}", index),
                    resolution: Resolution {
                        width: frame.width,
                        height: frame.height,
                    },
                });
            }
            Ok(None) => {
                tracing::debug!("Camera {} opened but produced no frame", index);
            }
            Err(e) => {
                tracing::debug!("Camera {} opened but failed to read: {}", index, e);
            }
        }
    }

    available
}
