//! In-memory sinks and helpers for recorder tests

use super::clock::ManualClock;
use super::sink::{SinkError, SinkFactory, SinkResult, SinkSpec, VideoSink};
use crate::capture::{Frame, PixelFormat};
use chrono::{Local, TimeZone};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Everything the fake sinks of one factory did
#[derive(Debug, Default)]
pub struct SinkLog {
    pub opened: Vec<PathBuf>,
    /// (path, frames written) in close order
    pub closed: Vec<(PathBuf, u64)>,
    pub open_now: usize,
    pub max_open: usize,
    pub appended: u64,
}

/// Holds `append` calls until released
#[derive(Default)]
pub struct Gate {
    released: Mutex<bool>,
    released_cv: Condvar,
    entered: Mutex<bool>,
    entered_cv: Condvar,
}

impl Gate {
    pub fn release(&self) {
        *self.released.lock() = true;
        self.released_cv.notify_all();
    }

    /// Block until some `append` is waiting on the gate
    pub fn wait_entered(&self) {
        let mut entered = self.entered.lock();
        while !*entered {
            self.entered_cv.wait(&mut entered);
        }
    }

    fn pass(&self) {
        {
            *self.entered.lock() = true;
            self.entered_cv.notify_all();
        }
        let mut released = self.released.lock();
        while !*released {
            self.released_cv.wait(&mut released);
        }
    }
}

/// Sink factory that never touches an encoder
#[derive(Default)]
pub struct FakeSinkFactory {
    pub log: Arc<Mutex<SinkLog>>,
    fail_opens: AtomicU32,
    fail_appends: Arc<AtomicU32>,
    /// Gate applied to sinks whose file name starts with the prefix
    gate: Option<(String, Arc<Gate>)>,
}

impl FakeSinkFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `count` opens
    pub fn failing_opens(count: u32) -> Arc<Self> {
        let factory = Self::default();
        factory.fail_opens.store(count, Ordering::SeqCst);
        Arc::new(factory)
    }

    /// Fail the next `count` appends
    pub fn failing_appends(count: u32) -> Arc<Self> {
        let factory = Self::default();
        factory.fail_appends.store(count, Ordering::SeqCst);
        Arc::new(factory)
    }

    /// Every append waits on `gate`
    pub fn gated(gate: Arc<Gate>) -> Arc<Self> {
        Self::gated_for("", gate)
    }

    /// Appends to files named `<prefix>...` wait on `gate`
    pub fn gated_for(prefix: &str, gate: Arc<Gate>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some((prefix.to_string(), gate)),
            ..Self::default()
        })
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.log.lock().opened.clone()
    }

    pub fn closed(&self) -> Vec<(PathBuf, u64)> {
        self.log.lock().closed.clone()
    }

    pub fn open_now(&self) -> usize {
        self.log.lock().open_now
    }

    pub fn max_open(&self) -> usize {
        self.log.lock().max_open
    }
}

impl SinkFactory for FakeSinkFactory {
    fn open(&self, spec: &SinkSpec) -> SinkResult<Box<dyn VideoSink>> {
        let remaining = self.fail_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated open failure",
            )));
        }

        // Occupy the name on disk like a real encoder would
        std::fs::write(&spec.path, b"")?;

        let file_name = spec
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let gate = self
            .gate
            .as_ref()
            .filter(|(prefix, _)| file_name.starts_with(prefix.as_str()))
            .map(|(_, gate)| gate.clone());

        let mut log = self.log.lock();
        log.opened.push(spec.path.clone());
        log.open_now += 1;
        log.max_open = log.max_open.max(log.open_now);

        Ok(Box::new(FakeSink {
            path: spec.path.clone(),
            width: spec.width,
            height: spec.height,
            frames: 0,
            closed: false,
            log: self.log.clone(),
            fail_appends: self.fail_appends.clone(),
            gate,
        }))
    }
}

pub struct FakeSink {
    path: PathBuf,
    width: u32,
    height: u32,
    frames: u64,
    closed: bool,
    log: Arc<Mutex<SinkLog>>,
    fail_appends: Arc<AtomicU32>,
    gate: Option<Arc<Gate>>,
}

impl VideoSink for FakeSink {
    fn append(&mut self, _frame: &Frame) -> SinkResult<()> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        let remaining = self.fail_appends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_appends.store(remaining - 1, Ordering::SeqCst);
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated disk full",
            )));
        }
        self.frames += 1;
        self.log.lock().appended += 1;
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.frames == 0 {
            let _ = std::fs::remove_file(&self.path);
        }
        let mut log = self.log.lock();
        log.open_now -= 1;
        log.closed.push((self.path.clone(), self.frames));
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl Drop for FakeSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Clock parked at 2026-01-15 09:00:00 local time
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
    ))
}

/// Blank BGR frame
pub fn frame(width: u32, height: u32) -> Frame {
    Frame::new(
        vec![0; (width * height * 3) as usize],
        width,
        height,
        PixelFormat::Bgr24,
    )
}
