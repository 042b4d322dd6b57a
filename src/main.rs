//! Headless multi-camera recorder
//!
//! Loads settings, discovers cameras, and records every camera in chunks
//! until Ctrl+C or until every session reaches its cap.

use anyhow::{bail, Context, Result};
use multicam_recorder::capture::{
    CameraInfo, CameraSource, CapturePoller, CaptureResult, Resolution, TestPatternSource,
};
use multicam_recorder::recorder::{ffmpeg_available, RecordingEvent, SessionRegistry};
use multicam_recorder::settings::{settings_path, Settings};
use multicam_recorder::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

const SIMULATED_RESOLUTION: Resolution = Resolution {
    width: 640,
    height: 480,
};

/// Where a camera's frames come from
#[derive(Debug, Clone)]
enum CameraKind {
    #[cfg(feature = "native-camera")]
    Device(u32),
    Simulated(u32),
}

struct Camera {
    info: CameraInfo,
    kind: CameraKind,
}

impl Camera {
    /// Opener run on the capture thread
    fn opener(&self) -> impl FnOnce() -> CaptureResult<Box<dyn CameraSource>> + Send + 'static {
        let kind = self.kind.clone();
        let Resolution { width, height } = self.info.resolution;
        move || -> CaptureResult<Box<dyn CameraSource>> {
            match kind {
                #[cfg(feature = "native-camera")]
                CameraKind::Device(index) => Ok(Box::new(
                    multicam_recorder::capture::WebcamSource::open(index)?,
                )),
                CameraKind::Simulated(seed) => {
                    Ok(Box::new(TestPatternSource::new(width, height).with_seed(seed)))
                }
            }
        }
    }
}

#[cfg(feature = "native-camera")]
fn discover_devices(settings: &Settings) -> Vec<Camera> {
    use multicam_recorder::capture::{find_available_cameras, WebcamSource};

    find_available_cameras(settings.max_scan, WebcamSource::open)
        .into_iter()
        .filter_map(|info| {
            let index = info.id.parse().ok()?;
            Some(Camera {
                info,
                kind: CameraKind::Device(index),
            })
        })
        .collect()
}

#[cfg(not(feature = "native-camera"))]
fn discover_devices(_settings: &Settings) -> Vec<Camera> {
    tracing::info!("Built without native-camera, skipping device scan");
    Vec::new()
}

fn discover_cameras(settings: &Settings) -> Vec<Camera> {
    let mut cameras = discover_devices(settings);

    for seed in 0..settings.simulated_cameras {
        cameras.push(Camera {
            info: CameraInfo {
                id: format!("sim{}", seed),
                name: format!("Simulated {}", seed),
                resolution: SIMULATED_RESOLUTION,
            },
            kind: CameraKind::Simulated(seed),
        });
    }

    cameras
}

fn log_event(event: &RecordingEvent) {
    match event {
        RecordingEvent::SessionStarted { camera_id } => {
            tracing::info!("Camera {} recording", camera_id);
        }
        RecordingEvent::ChunkOpened { camera_id, path } => {
            tracing::info!("Camera {} writing {:?}", camera_id, path);
        }
        RecordingEvent::ChunkClosed {
            camera_id,
            path,
            frames,
        } => {
            tracing::info!("Camera {} closed {:?} ({} frames)", camera_id, path, frames);
        }
        RecordingEvent::SinkFailed { camera_id, error } => {
            tracing::warn!("Camera {} sink failed: {}", camera_id, error);
        }
        RecordingEvent::SessionStopped { camera_id, reason } => {
            tracing::info!("Camera {} stopped ({:?})", camera_id, reason);
        }
    }
}

/// Resolves once no session is active any more
///
/// Cameras whose source failed to open drop out of the registry, so they do
/// not hold this open.
async fn wait_until_idle(registry: &SessionRegistry) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        if !registry.any_active() {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    multicam_recorder::init_tracing();

    tracing::info!("Starting multicam-recorder v{}", env!("CARGO_PKG_VERSION"));

    let path = settings_path();
    let settings = Settings::load(&path)
        .with_context(|| format!("failed to load settings from {:?}", path))?;

    if !ffmpeg_available() {
        bail!("ffmpeg was not found on PATH");
    }

    let cameras = discover_cameras(&settings);
    if cameras.is_empty() {
        let e = AppError::Recording(
            "no cameras available (set simulated_cameras to record test patterns)".to_string(),
        );
        tracing::error!("[{}] {}", e.code(), e);
        return Err(e.into());
    }

    for (slot, camera) in cameras.iter().enumerate() {
        tracing::info!(
            "{} -> id {} ({}x{}, {})",
            settings.label_for(slot, &camera.info.id),
            camera.info.id,
            camera.info.resolution.width,
            camera.info.resolution.height,
            camera.info.name
        );
    }

    let registry = Arc::new(SessionRegistry::default());

    let mut events = registry.subscribe();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log fell behind, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let config = settings.session_config();
    let started = match registry.start_all(cameras.iter().map(|c| c.info.id.clone()), &config) {
        Ok(started) => started,
        Err(e) => {
            tracing::error!("[{}] Failed to start recording: {}", e.code(), e);
            return Err(e).context("failed to start recording sessions");
        }
    };
    tracing::info!(
        "Recording {} camera(s) to {:?} in {} min chunks, capped at {} min",
        started.len(),
        config.output_dir,
        config.chunk_minutes,
        config.max_session_minutes
    );

    let mut pollers: Vec<CapturePoller> = cameras
        .iter()
        .map(|camera| {
            CapturePoller::spawn(
                camera.info.id.clone(),
                camera.opener(),
                registry.clone(),
                settings.poll_interval(),
            )
        })
        .collect();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            tracing::info!("Interrupted, stopping");
        }
        _ = wait_until_idle(&registry) => {
            tracing::info!("All sessions reached their limit");
        }
    }

    let poller_stats = tokio::task::spawn_blocking(move || {
        pollers
            .iter_mut()
            .map(|poller| (poller.camera_id().to_string(), poller.stop()))
            .collect::<Vec<_>>()
    })
    .await
    .context("capture threads did not shut down")?;

    let snapshots = registry.snapshots();
    let stopped = registry.stop_all();
    tracing::info!("Stopped {} session(s)", stopped);

    for (camera_id, stats) in poller_stats {
        tracing::info!(
            "Camera {}: {} captured, {} recorded, {} read errors",
            camera_id,
            stats.frames_captured,
            stats.frames_recorded,
            stats.capture_errors
        );
    }
    for snapshot in snapshots {
        tracing::info!(
            "Camera {}: {} frames in {} full chunk(s), {} dropped, {} sink errors",
            snapshot.camera_id,
            snapshot.frames_written,
            snapshot.chunks_completed,
            snapshot.frames_dropped,
            snapshot.sink_errors
        );
    }

    // Sessions are gone, so the event channel closes once the registry drops
    drop(registry);
    if tokio::time::timeout(Duration::from_secs(1), event_task).await.is_err() {
        tracing::debug!("Event log still draining at exit");
    }

    Ok(())
}
