//! Per-camera recording session
//!
//! Turns one camera's frame stream into a series of chunk files of bounded
//! length, and stops for good once the session cap is reached. All state
//! lives behind one mutex so `start`, `write_frame` and `stop` on the same
//! session never interleave; separate sessions share nothing.

use super::clock::Clock;
use super::naming::next_chunk_path;
use super::sink::{SinkFactory, SinkSpec, VideoCodec, VideoSink};
use super::state::{RecordingEvent, SessionConfig, SessionSnapshot, SessionState, StopReason};
use crate::capture::Frame;
use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mutable part of a session, guarded by the session lock
#[derive(Default)]
struct SessionInner {
    state: SessionState,
    session_started_at: Option<DateTime<Local>>,
    current_chunk_started_at: Option<DateTime<Local>>,
    minutes_recorded: u32,

    /// Absent until the first frame of a chunk supplies the dimensions
    sink: Option<Box<dyn VideoSink>>,

    /// Sink failures since the last successful open, for log throttling
    failure_streak: u32,

    chunks_completed: u64,
    frames_written: u64,
    frames_dropped: u64,
    sink_errors: u64,
    output_files: Vec<PathBuf>,
}

/// Chunked recorder for one camera stream
pub struct RecordingSession {
    camera_id: String,
    output_dir: PathBuf,
    chunk_minutes: u32,
    max_session_minutes: u32,
    codec: VideoCodec,
    frame_rate: f64,
    sinks: Arc<dyn SinkFactory>,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<RecordingEvent>>,
    inner: Mutex<SessionInner>,
}

impl RecordingSession {
    /// Create an idle session, creating the output directory if needed
    pub fn new(
        camera_id: impl Into<String>,
        config: &SessionConfig,
        sinks: Arc<dyn SinkFactory>,
        clock: Arc<dyn Clock>,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;

        Ok(Self {
            camera_id: camera_id.into(),
            output_dir: config.output_dir.clone(),
            chunk_minutes: config.chunk_minutes.max(1),
            max_session_minutes: config.max_session_minutes,
            codec: config.codec,
            frame_rate: config.frame_rate,
            sinks,
            clock,
            events: None,
            inner: Mutex::new(SessionInner::default()),
        })
    }

    /// Publish lifecycle events on `events`
    pub fn with_events(mut self, events: broadcast::Sender<RecordingEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Effective chunk length in minutes
    pub fn chunk_minutes(&self) -> u32 {
        self.chunk_minutes
    }

    pub fn max_session_minutes(&self) -> u32 {
        self.max_session_minutes
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn minutes_recorded(&self) -> u32 {
        self.inner.lock().minutes_recorded
    }

    pub fn has_open_sink(&self) -> bool {
        self.inner.lock().sink.is_some()
    }

    /// Minutes since `start()`, or `None` when not active
    pub fn elapsed_session_minutes(&self) -> Option<f64> {
        let inner = self.inner.lock();
        let started = inner.session_started_at?;
        Some(minutes_between(started, self.clock.now()))
    }

    /// Begin a new session. No-op when already active.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Active {
            tracing::debug!("Session for camera {} already active", self.camera_id);
            return;
        }

        // Leftover sink from a previous run, if any
        self.close_sink(&mut inner, false);

        let now = self.clock.now();
        inner.session_started_at = Some(now);
        inner.current_chunk_started_at = Some(now);
        inner.minutes_recorded = 0;
        inner.failure_streak = 0;
        inner.state = SessionState::Active;

        tracing::info!(
            "Recording camera {} to {:?} ({} min chunks, {} min cap)",
            self.camera_id,
            self.output_dir,
            self.chunk_minutes,
            self.max_session_minutes
        );
        self.emit(RecordingEvent::SessionStarted {
            camera_id: self.camera_id.clone(),
        });
    }

    /// Offer a frame to the session
    ///
    /// Returns `true` when the frame was appended to the current chunk. Frames
    /// offered while not active, after the session cap, or while the sink is
    /// failing return `false`; none of these is an error.
    pub fn write_frame(&self, frame: &Frame) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Active {
            return false;
        }

        let now = self.clock.now();
        if self.session_exceeded(&inner, now) {
            tracing::info!(
                "Camera {} reached the {} minute session cap",
                self.camera_id,
                self.max_session_minutes
            );
            self.stop_locked(&mut inner, StopReason::SessionLimit);
            return false;
        }

        let written = self.append_frame(&mut inner, frame);

        if self.chunk_elapsed(&inner, now) {
            inner.minutes_recorded += self.chunk_minutes;
            if inner.minutes_recorded >= self.max_session_minutes
                || self.session_exceeded(&inner, now)
            {
                tracing::info!(
                    "Camera {} reached the session cap at a chunk boundary",
                    self.camera_id
                );
                self.close_sink(&mut inner, true);
                self.stop_locked(&mut inner, StopReason::SessionLimit);
            } else {
                self.rotate(&mut inner, now);
            }
        }

        written
    }

    /// Stop recording and reset bookkeeping. Safe to call in any state.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        self.stop_locked(&mut inner, StopReason::Requested);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            camera_id: self.camera_id.clone(),
            state: inner.state,
            chunk_minutes: self.chunk_minutes,
            max_session_minutes: self.max_session_minutes,
            session_started_at: inner.session_started_at,
            current_chunk_started_at: inner.current_chunk_started_at,
            minutes_recorded: inner.minutes_recorded,
            current_chunk_path: inner.sink.as_ref().map(|sink| sink.path().to_path_buf()),
            sink_open: inner.sink.is_some(),
            chunks_completed: inner.chunks_completed,
            frames_written: inner.frames_written,
            frames_dropped: inner.frames_dropped,
            sink_errors: inner.sink_errors,
            output_files: inner.output_files.clone(),
        }
    }

    fn session_exceeded(&self, inner: &SessionInner, now: DateTime<Local>) -> bool {
        match inner.session_started_at {
            Some(started) => now - started >= Duration::minutes(self.max_session_minutes as i64),
            None => false,
        }
    }

    fn chunk_elapsed(&self, inner: &SessionInner, now: DateTime<Local>) -> bool {
        match inner.current_chunk_started_at {
            Some(started) => now - started >= Duration::minutes(self.chunk_minutes as i64),
            None => false,
        }
    }

    /// Lazy-open the sink if needed and append; every failure is absorbed
    fn append_frame(&self, inner: &mut SessionInner, frame: &Frame) -> bool {
        if !frame.is_well_formed() {
            tracing::warn!(
                "Dropping malformed {}x{} frame from camera {} ({} bytes, expected {})",
                frame.width,
                frame.height,
                self.camera_id,
                frame.data.len(),
                frame.expected_len()
            );
            inner.frames_dropped += 1;
            return false;
        }

        if inner.sink.is_none() && !self.open_sink(inner, frame) {
            inner.frames_dropped += 1;
            return false;
        }

        let Some(sink) = inner.sink.as_mut() else {
            inner.frames_dropped += 1;
            return false;
        };

        if sink.dimensions() != frame.dimensions() {
            let (width, height) = sink.dimensions();
            tracing::warn!(
                "Dropping {}x{} frame from camera {}: chunk was opened at {}x{}",
                frame.width,
                frame.height,
                self.camera_id,
                width,
                height
            );
            inner.frames_dropped += 1;
            return false;
        }

        match sink.append(frame) {
            Ok(()) => {
                inner.frames_written += 1;
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to write frame for camera {} to {:?}: {}",
                    self.camera_id,
                    sink.path(),
                    e
                );
                inner.sink_errors += 1;
                inner.frames_dropped += 1;
                self.emit(RecordingEvent::SinkFailed {
                    camera_id: self.camera_id.clone(),
                    error: e.to_string(),
                });
                // Discard the sink; the next frame lazily opens a fresh file
                self.close_sink(inner, false);
                false
            }
        }
    }

    fn open_sink(&self, inner: &mut SessionInner, frame: &Frame) -> bool {
        let chunk_started_at = inner.current_chunk_started_at.unwrap_or_else(|| self.clock.now());
        let spec = SinkSpec {
            path: next_chunk_path(&self.output_dir, &self.camera_id, &chunk_started_at, self.codec),
            width: frame.width,
            height: frame.height,
            pixel_format: frame.format,
            codec: self.codec,
            frame_rate: self.frame_rate,
        };

        match self.sinks.open(&spec) {
            Ok(sink) => {
                tracing::info!(
                    "Opened chunk {:?} for camera {} ({}x{})",
                    spec.path,
                    self.camera_id,
                    spec.width,
                    spec.height
                );
                inner.sink = Some(sink);
                inner.failure_streak = 0;
                self.emit(RecordingEvent::ChunkOpened {
                    camera_id: self.camera_id.clone(),
                    path: spec.path,
                });
                true
            }
            Err(e) => {
                if inner.failure_streak == 0 {
                    tracing::warn!(
                        "Failed to open chunk {:?} for camera {}: {}",
                        spec.path,
                        self.camera_id,
                        e
                    );
                } else {
                    tracing::debug!("Chunk open retry failed for camera {}: {}", self.camera_id, e);
                }
                inner.failure_streak += 1;
                inner.sink_errors += 1;
                self.emit(RecordingEvent::SinkFailed {
                    camera_id: self.camera_id.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Close the current sink, if any, and record its file
    ///
    /// A sink that never accepted a frame leaves no file behind, so it is not
    /// recorded as output.
    fn close_sink(&self, inner: &mut SessionInner, completed: bool) {
        let Some(mut sink) = inner.sink.take() else {
            return;
        };

        sink.close();
        let path = sink.path().to_path_buf();
        let frames = sink.frames_written();

        if frames == 0 {
            tracing::debug!(
                "Discarded empty chunk {:?} for camera {}",
                path,
                self.camera_id
            );
            return;
        }

        tracing::info!(
            "Closed chunk {:?} for camera {} ({} frames)",
            path,
            self.camera_id,
            frames
        );

        if completed {
            inner.chunks_completed += 1;
        }
        inner.output_files.push(path.clone());
        self.emit(RecordingEvent::ChunkClosed {
            camera_id: self.camera_id.clone(),
            path,
            frames,
        });
    }

    fn rotate(&self, inner: &mut SessionInner, now: DateTime<Local>) {
        tracing::debug!(
            "Rotating camera {} after {} recorded minutes",
            self.camera_id,
            inner.minutes_recorded
        );
        self.close_sink(inner, true);
        inner.current_chunk_started_at = Some(now);
    }

    fn stop_locked(&self, inner: &mut SessionInner, reason: StopReason) {
        let was_active = inner.state == SessionState::Active;

        self.close_sink(inner, false);
        inner.session_started_at = None;
        inner.current_chunk_started_at = None;
        inner.minutes_recorded = 0;
        inner.failure_streak = 0;
        inner.state = SessionState::Stopped;

        if was_active {
            tracing::info!("Stopped recording camera {} ({:?})", self.camera_id, reason);
            self.emit(RecordingEvent::SessionStopped {
                camera_id: self.camera_id.clone(),
                reason,
            });
        }
    }

    fn emit(&self, event: RecordingEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(mut sink) = self.inner.get_mut().sink.take() {
            sink.close();
        }
    }
}

fn minutes_between(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::clock::ManualClock;
    use crate::recorder::testing::{frame, manual_clock, FakeSinkFactory, Gate};
    use tempfile::tempdir;

    fn session(
        dir: &Path,
        chunk_minutes: u32,
        max_session_minutes: u32,
        sinks: &Arc<FakeSinkFactory>,
        clock: &Arc<ManualClock>,
    ) -> RecordingSession {
        let config = SessionConfig::new(dir, chunk_minutes, max_session_minutes);
        RecordingSession::new("0", &config, sinks.clone(), clock.clone()).unwrap()
    }

    #[test]
    fn test_rotation_cadence() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 1, 60, &sinks, &clock);
        session.start();

        for t in (0..=210).step_by(10) {
            assert!(session.write_frame(&frame(64, 48)), "frame at {}s", t);
            assert_eq!(session.minutes_recorded(), (t / 60) as u32, "at {}s", t);
            clock.advance_secs(10);
        }

        let closed = sinks.closed();
        assert_eq!(closed.len(), 3);
        assert_eq!(sinks.opened().len(), 4);
        // 0s..=60s, then 70s..=120s
        assert_eq!(closed[0].1, 7);
        assert_eq!(closed[1].1, 6);
        assert_eq!(closed[0].0, dir.path().join("cam0_20260115_090000.mp4"));
        assert_eq!(closed[1].0, dir.path().join("cam0_20260115_090100.mp4"));
        assert_eq!(sinks.max_open(), 1);
        assert_eq!(session.snapshot().chunks_completed, 3);
    }

    #[test]
    fn test_session_cap_rejects_frames() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 3, &sinks, &clock);
        session.start();

        for t in (0..180).step_by(30) {
            assert!(session.write_frame(&frame(64, 48)), "frame at {}s", t);
            clock.advance_secs(30);
        }

        assert!(!session.write_frame(&frame(64, 48)));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!session.has_open_sink());
        assert_eq!(sinks.open_now(), 0);

        clock.advance_secs(30);
        assert!(!session.write_frame(&frame(64, 48)));
        assert_eq!(sinks.opened().len(), 1);
    }

    #[test]
    fn test_cap_cuts_the_third_chunk() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 12, &sinks, &clock);
        session.start();

        let mut accepted = Vec::new();
        for t in (0..=960).step_by(30) {
            accepted.push((t, session.write_frame(&frame(64, 48))));
            clock.advance_secs(30);
        }

        for (t, ok) in accepted {
            assert_eq!(ok, t < 720, "frame at {}s", t);
        }

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Stopped);
        assert_eq!(snapshot.chunks_completed, 2);
        assert_eq!(snapshot.output_files.len(), 3);
        assert_eq!(snapshot.minutes_recorded, 0);
        assert!(snapshot.session_started_at.is_none());

        let closed = sinks.closed();
        assert_eq!(closed.len(), 3);
        assert_eq!(closed[0].0, dir.path().join("cam0_20260115_090000.mp4"));
        assert_eq!(closed[1].0, dir.path().join("cam0_20260115_090500.mp4"));
        assert_eq!(closed[2].0, dir.path().join("cam0_20260115_091000.mp4"));
        // third chunk holds 630s, 660s, 690s: well under two minutes
        assert_eq!(closed[2].1, 3);
        assert_eq!(sinks.max_open(), 1);
    }

    #[test]
    fn test_cap_at_chunk_boundary_opens_no_new_chunk() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 10, &sinks, &clock);
        session.start();

        for _ in 0..=24 {
            session.write_frame(&frame(64, 48));
            clock.advance_secs(30);
        }

        assert_eq!(session.state(), SessionState::Stopped);
        let closed = sinks.closed();
        assert_eq!(sinks.opened().len(), 2);
        assert_eq!(closed.len(), 2);
        // 330s..=570s; the 600s frame hits the cap
        assert_eq!(closed[1].1, 9);
    }

    #[test]
    fn test_open_failure_retries_on_next_frame() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::failing_opens(3);
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);
        session.start();

        for _ in 0..3 {
            assert!(!session.write_frame(&frame(64, 48)));
            assert_eq!(session.state(), SessionState::Active);
            assert!(!session.has_open_sink());
        }

        assert!(session.write_frame(&frame(64, 48)));
        assert!(session.has_open_sink());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.frames_dropped, 3);
        assert_eq!(snapshot.sink_errors, 3);
        assert_eq!(snapshot.frames_written, 1);
        assert_eq!(sinks.opened().len(), 1);
    }

    #[test]
    fn test_append_failure_discards_sink() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::failing_appends(1);
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);
        session.start();

        assert!(!session.write_frame(&frame(64, 48)));
        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.has_open_sink());

        assert!(session.write_frame(&frame(64, 48)));
        let opened = sinks.opened();
        let chunk = dir.path().join("cam0_20260115_090000.mp4");
        // The failed sink released its empty file, so the name is reused
        assert_eq!(opened, vec![chunk.clone(), chunk.clone()]);
        assert_eq!(session.snapshot().sink_errors, 1);

        session.stop();
        assert_eq!(session.snapshot().output_files, vec![chunk.clone()]);
        assert!(chunk.exists());
    }

    #[test]
    fn test_chunk_path_appears_with_first_frame() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 1, 60, &sinks, &clock);
        session.start();
        assert_eq!(session.snapshot().current_chunk_path, None);

        assert!(session.write_frame(&frame(64, 48)));
        assert_eq!(
            session.snapshot().current_chunk_path,
            Some(dir.path().join("cam0_20260115_090000.mp4"))
        );

        // Rotation closes the sink; the next chunk has no file yet
        clock.advance_secs(60);
        assert!(session.write_frame(&frame(64, 48)));
        assert_eq!(session.snapshot().current_chunk_path, None);
    }

    #[test]
    fn test_failing_sink_leaves_no_files() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::failing_appends(20);
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);
        session.start();

        for _ in 0..20 {
            assert!(!session.write_frame(&frame(64, 48)));
            clock.advance_secs(1);
        }

        let snapshot = session.snapshot();
        assert_eq!(snapshot.sink_errors, 20);
        assert_eq!(snapshot.frames_dropped, 20);
        assert!(snapshot.output_files.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_mismatched_frames_are_dropped() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);
        session.start();

        assert!(session.write_frame(&frame(64, 48)));
        assert!(!session.write_frame(&frame(32, 24)));
        assert!(session.has_open_sink());
        assert!(session.write_frame(&frame(64, 48)));

        let mut malformed = frame(64, 48);
        malformed.data.truncate(10);
        assert!(!session.write_frame(&malformed));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.frames_written, 2);
        assert_eq!(snapshot.frames_dropped, 2);
        assert_eq!(snapshot.sink_errors, 0);
    }

    #[test]
    fn test_write_before_start_is_noop() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.write_frame(&frame(64, 48)));
        assert!(sinks.opened().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 1, 60, &sinks, &clock);
        session.start();
        session.write_frame(&frame(64, 48));

        session.stop();
        let once = serde_json::to_value(session.snapshot()).unwrap();
        session.stop();
        let twice = serde_json::to_value(session.snapshot()).unwrap();

        assert_eq!(once, twice);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(sinks.closed().len(), 1);
        assert!(!session.write_frame(&frame(64, 48)));
    }

    #[test]
    fn test_stop_from_idle() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 1, 60, &sinks, &clock);

        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(sinks.closed().is_empty());
    }

    #[test]
    fn test_restart_resets_bookkeeping() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 1, 60, &sinks, &clock);
        session.start();

        for _ in 0..=8 {
            session.write_frame(&frame(64, 48));
            clock.advance_secs(10);
        }
        assert_eq!(session.minutes_recorded(), 1);

        session.stop();
        clock.advance_secs(5);
        session.start();

        let restarted_at = clock.now();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.minutes_recorded, 0);
        assert_eq!(snapshot.session_started_at, Some(restarted_at));
        assert_eq!(snapshot.current_chunk_started_at, Some(restarted_at));
        assert!(!snapshot.sink_open);

        assert!(session.write_frame(&frame(64, 48)));
        let opened = sinks.opened();
        assert_eq!(
            opened.last().unwrap(),
            &dir.path().join("cam0_20260115_090135.mp4")
        );
    }

    #[test]
    fn test_start_is_idempotent_while_active() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 5, 60, &sinks, &clock);

        session.start();
        let started = session.snapshot().session_started_at;
        clock.advance_secs(30);
        session.start();

        assert_eq!(session.snapshot().session_started_at, started);
        assert!(session.elapsed_session_minutes().unwrap() >= 0.5);
    }

    #[test]
    fn test_chunk_length_is_clamped() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(dir.path(), 0, 60, &sinks, &clock);
        assert_eq!(session.chunk_minutes(), 1);
    }

    #[test]
    fn test_output_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let session = session(&nested, 5, 60, &sinks, &clock);

        assert!(nested.is_dir());
        assert_eq!(session.output_dir(), nested.as_path());
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let dir = tempdir().unwrap();
        let sinks = FakeSinkFactory::new();
        let clock = manual_clock();
        let (tx, mut rx) = broadcast::channel(16);
        let session = session(dir.path(), 5, 60, &sinks, &clock).with_events(tx);

        session.start();
        session.write_frame(&frame(64, 48));
        session.stop();

        let path = dir.path().join("cam0_20260115_090000.mp4");
        assert_eq!(
            rx.try_recv().unwrap(),
            RecordingEvent::SessionStarted { camera_id: "0".into() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            RecordingEvent::ChunkOpened { camera_id: "0".into(), path: path.clone() }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            RecordingEvent::ChunkClosed { camera_id: "0".into(), path, frames: 1 }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            RecordingEvent::SessionStopped {
                camera_id: "0".into(),
                reason: StopReason::Requested
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_waits_for_in_flight_write() {
        let dir = tempdir().unwrap();
        let gate = Arc::new(Gate::default());
        let sinks = FakeSinkFactory::gated(gate.clone());
        let clock = manual_clock();
        let session = Arc::new(session(dir.path(), 5, 60, &sinks, &clock));
        session.start();

        let writer = {
            let session = session.clone();
            std::thread::spawn(move || session.write_frame(&frame(64, 48)))
        };
        gate.wait_entered();

        let stopper = {
            let session = session.clone();
            std::thread::spawn(move || session.stop())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!stopper.is_finished());

        gate.release();
        assert!(writer.join().unwrap());
        stopper.join().unwrap();

        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(sinks.closed(), vec![(dir.path().join("cam0_20260115_090000.mp4"), 1)]);
        assert!(!session.write_frame(&frame(64, 48)));
    }
}
