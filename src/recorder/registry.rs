//! Session registry
//!
//! Tracks one recording session per camera, starts and stops them together,
//! and routes incoming frames to the right session. The registry itself makes
//! no timing decisions; its lock only covers the camera-to-session map and is
//! never held while a session writes.

use super::clock::{Clock, SystemClock};
use super::ffmpeg::FfmpegSinkFactory;
use super::session::RecordingSession;
use super::sink::SinkFactory;
use super::state::{RecordingEvent, SessionConfig, SessionSnapshot, SessionState};
use crate::capture::Frame;
use crate::utils::AppResult;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Manages the recording sessions of all active cameras
pub struct SessionRegistry {
    /// Sessions by camera id
    sessions: Mutex<HashMap<String, Arc<RecordingSession>>>,

    /// Opens chunk files for every session
    sinks: Arc<dyn SinkFactory>,

    /// Shared time source; each session keeps its own timestamps
    clock: Arc<dyn Clock>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(sinks: Arc<dyn SinkFactory>, clock: Arc<dyn Clock>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            sessions: Mutex::new(HashMap::new()),
            sinks,
            clock,
            event_tx,
        }
    }

    /// Subscribe to events from every session
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Start a session for every camera that does not have one yet
    ///
    /// Returns the ids of the cameras that were started. Cameras already
    /// tracked keep their running session untouched.
    pub fn start_all<I, S>(&self, camera_ids: I, config: &SessionConfig) -> AppResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: Vec<String> = camera_ids.into_iter().map(Into::into).collect();
        let missing: Vec<String> = {
            let sessions = self.sessions.lock();
            let mut seen = HashSet::new();
            requested
                .into_iter()
                .filter(|id| !sessions.contains_key(id) && seen.insert(id.clone()))
                .collect()
        };

        let mut created = Vec::with_capacity(missing.len());
        for camera_id in missing {
            let session = RecordingSession::new(
                camera_id.clone(),
                config,
                self.sinks.clone(),
                self.clock.clone(),
            )?
            .with_events(self.event_tx.clone());
            created.push((camera_id, Arc::new(session)));
        }

        let mut started = Vec::with_capacity(created.len());
        {
            let mut sessions = self.sessions.lock();
            for (camera_id, session) in created {
                if sessions.contains_key(&camera_id) {
                    continue;
                }
                session.start();
                sessions.insert(camera_id.clone(), session);
                started.push(camera_id);
            }
        }

        if !started.is_empty() {
            tracing::info!(
                "Started recording {} camera(s) to {:?}",
                started.len(),
                config.output_dir
            );
        }
        Ok(started)
    }

    /// Stop every session and forget them
    ///
    /// Returns how many sessions were stopped. The next `start_all` creates
    /// fresh sessions.
    pub fn stop_all(&self) -> usize {
        let sessions = std::mem::take(&mut *self.sessions.lock());
        let count = sessions.len();

        for session in sessions.values() {
            session.stop();
        }

        if count > 0 {
            tracing::info!("Stopped recording {} camera(s)", count);
        }
        count
    }

    /// Stop and forget one camera's session
    pub fn remove(&self, camera_id: &str) -> bool {
        let removed = self.sessions.lock().remove(camera_id);
        match removed {
            Some(session) => {
                session.stop();
                true
            }
            None => false,
        }
    }

    /// Hand a frame to the camera's session
    ///
    /// Returns `false` when the camera has no session or the session did not
    /// write the frame.
    pub fn route_frame(&self, camera_id: &str, frame: &Frame) -> bool {
        let session = self.sessions.lock().get(camera_id).cloned();
        match session {
            Some(session) => session.write_frame(frame),
            None => false,
        }
    }

    /// Whether a recording run is in progress (`start_all` without `stop_all`)
    pub fn is_recording(&self) -> bool {
        !self.sessions.lock().is_empty()
    }

    /// Whether any session is still writing
    pub fn any_active(&self) -> bool {
        self.all_sessions()
            .iter()
            .any(|session| session.state() == SessionState::Active)
    }

    pub fn session(&self, camera_id: &str) -> Option<Arc<RecordingSession>> {
        self.sessions.lock().get(camera_id).cloned()
    }

    /// Tracked camera ids, sorted
    pub fn cameras(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshots of every tracked session, sorted by camera id
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<SessionSnapshot> = self
            .all_sessions()
            .iter()
            .map(|session| session.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the session handles so callers never hold the map lock
    fn all_sessions(&self) -> Vec<Arc<RecordingSession>> {
        self.sessions.lock().values().cloned().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Arc::new(FfmpegSinkFactory::new()), Arc::new(SystemClock))
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}
