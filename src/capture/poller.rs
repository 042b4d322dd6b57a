//! Capture loop
//!
//! Each camera gets its own thread that pulls frames from a [`CameraSource`]
//! and routes them to the matching recording session.

use super::traits::{CameraSource, CaptureResult};
use crate::recorder::SessionRegistry;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Default delay between polls, matching a ~30 ms UI tick
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Counters reported by a capture loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStats {
    /// Frames the source delivered
    pub frames_captured: u64,
    /// Frames a session appended to a chunk
    pub frames_recorded: u64,
    /// Failed reads
    pub capture_errors: u64,
}

#[derive(Default)]
struct Counters {
    frames_captured: AtomicU64,
    frames_recorded: AtomicU64,
    capture_errors: AtomicU64,
}

/// Background thread polling one camera
pub struct CapturePoller {
    camera_id: String,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl CapturePoller {
    /// Start polling `camera_id`
    ///
    /// `open` runs on the capture thread, so the source itself never crosses
    /// threads. If it fails the camera's session is removed from `registry`,
    /// the loop exits, and [`is_running`](Self::is_running) turns false.
    pub fn spawn<S, F>(
        camera_id: impl Into<String>,
        open: F,
        registry: Arc<SessionRegistry>,
        interval: Duration,
    ) -> Self
    where
        S: CameraSource,
        F: FnOnce() -> CaptureResult<S> + Send + 'static,
    {
        let camera_id = camera_id.into();
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let thread_id = camera_id.clone();
        let thread_running = running.clone();
        let thread_counters = counters.clone();

        let handle = std::thread::spawn(move || {
            let mut source = match open() {
                Ok(source) => source,
                Err(e) => {
                    tracing::error!("Failed to open camera {}: {}", thread_id, e);
                    // No frame will ever arrive for this session
                    registry.remove(&thread_id);
                    thread_running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            tracing::info!("Capture started for camera {}", thread_id);
            poll_loop(
                &thread_id,
                &mut source,
                &registry,
                &thread_running,
                &thread_counters,
                interval,
            );
            tracing::info!(
                "Capture finished for camera {} ({} frames captured, {} recorded)",
                thread_id,
                thread_counters.frames_captured.load(Ordering::Relaxed),
                thread_counters.frames_recorded.load(Ordering::Relaxed)
            );
        });

        Self {
            camera_id,
            running,
            counters,
            handle: Some(handle),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PollerStats {
        PollerStats {
            frames_captured: self.counters.frames_captured.load(Ordering::Relaxed),
            frames_recorded: self.counters.frames_recorded.load(Ordering::Relaxed),
            capture_errors: self.counters.capture_errors.load(Ordering::Relaxed),
        }
    }

    /// Stop the loop and wait for the thread to release the source
    pub fn stop(&mut self) -> PollerStats {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Capture thread for camera {} panicked", self.camera_id);
            }
        }
        self.stats()
    }
}

impl Drop for CapturePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop<S: CameraSource>(
    camera_id: &str,
    source: &mut S,
    registry: &SessionRegistry,
    running: &AtomicBool,
    counters: &Counters,
    interval: Duration,
) {
    let mut failing = false;

    while running.load(Ordering::SeqCst) {
        match source.next_frame() {
            Ok(Some(frame)) => {
                failing = false;
                counters.frames_captured.fetch_add(1, Ordering::Relaxed);
                if registry.route_frame(camera_id, &frame) {
                    counters.frames_recorded.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(None) => {}
            Err(e) => {
                counters.capture_errors.fetch_add(1, Ordering::Relaxed);
                if failing {
                    tracing::debug!("Camera {} read failed again: {}", camera_id, e);
                } else {
                    tracing::warn!("Camera {} read failed: {}", camera_id, e);
                    failing = true;
                }
            }
        }

        std::thread::sleep(interval);
    }
}
