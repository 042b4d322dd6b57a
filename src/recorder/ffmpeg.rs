//! FFmpeg-backed video sink
//!
//! Raw frames are piped to an `ffmpeg` child process which encodes them into
//! the chunk file with the session's fixed codec.

use super::sink::{SinkError, SinkFactory, SinkResult, SinkSpec, VideoCodec, VideoSink};
use crate::capture::Frame;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Program run when no other is configured
const FFMPEG: &str = "ffmpeg";

/// Check whether an `ffmpeg` binary is on the PATH
pub fn ffmpeg_available() -> bool {
    Command::new(FFMPEG)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Build the FFmpeg argument list for a sink
pub(crate) fn ffmpeg_args(spec: &SinkSpec) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),                // the path was claimed empty by `open`
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        spec.pixel_format.ffmpeg_name().into(),
        "-video_size".into(),
        format!("{}x{}", spec.width, spec.height),
        "-framerate".into(),
        format!("{}", spec.frame_rate),
        "-i".into(),
        "-".into(),                 // frames arrive on stdin
        "-an".into(),
        "-c:v".into(),
        spec.codec.ffmpeg_encoder().into(),
    ];

    let tuning = match spec.codec {
        VideoCodec::H264 => ["-preset", "veryfast", "-pix_fmt", "yuv420p"],
        VideoCodec::Mp4v => ["-q:v", "5", "-pix_fmt", "yuv420p"],
        VideoCodec::Mjpeg => ["-q:v", "5", "-pix_fmt", "yuvj420p"],
    };
    args.extend(tuning.iter().map(|arg| arg.to_string()));

    args.push(spec.path.to_string_lossy().to_string());
    args
}

/// One chunk file being encoded by FFmpeg
pub struct FfmpegSink {
    process: Option<Child>,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FfmpegSink {
    /// Claim the output path and start the encoder
    ///
    /// Fails with an I/O error if the directory cannot be written or the file
    /// already exists, before any encoder process is started.
    pub fn open(spec: &SinkSpec) -> SinkResult<Self> {
        Self::open_with(Path::new(FFMPEG), spec)
    }

    /// Like [`open`](Self::open), running `program` as the encoder
    pub fn open_with(program: &Path, spec: &SinkSpec) -> SinkResult<Self> {
        if let Some(parent) = spec.path.parent() {
            fs::create_dir_all(parent)?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&spec.path)?;

        let process = Command::new(program)
            .args(ffmpeg_args(spec))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let process = match process {
            Ok(process) => process,
            Err(e) => {
                let _ = fs::remove_file(&spec.path);
                return Err(SinkError::Encoder(format!("Failed to start FFmpeg: {}", e)));
            }
        };

        tracing::debug!(
            "Started FFmpeg sink: {}x{} @ {}fps, codec={}, output: {:?}",
            spec.width,
            spec.height,
            spec.frame_rate,
            spec.codec.ffmpeg_encoder(),
            spec.path
        );

        Ok(Self {
            process: Some(process),
            path: spec.path.clone(),
            width: spec.width,
            height: spec.height,
            frames_written: 0,
        })
    }
}

impl VideoSink for FfmpegSink {
    fn append(&mut self, frame: &Frame) -> SinkResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(SinkError::Encoder(format!(
                "Frame is {}x{}, sink expects {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }

        let stdin = self
            .process
            .as_mut()
            .and_then(|process| process.stdin.as_mut())
            .ok_or(SinkError::Closed)?;

        stdin.write_all(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };

        // EOF tells FFmpeg to finalize the container
        drop(process.stdin.take());

        match process.wait_with_output() {
            Ok(output) if !output.status.success() => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(
                    "FFmpeg exited with status {} for {:?}: {}",
                    output.status,
                    self.path,
                    stderr.trim()
                );
            }
            Ok(_) => {
                tracing::debug!(
                    "FFmpeg sink finished: {} frames, output: {:?}",
                    self.frames_written,
                    self.path
                );
            }
            Err(e) => {
                tracing::warn!("Failed to wait for FFmpeg on {:?}: {}", self.path, e);
            }
        }

        // Nothing was encoded; release the claimed name
        if self.frames_written == 0 {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove empty chunk {:?}: {}", self.path, e);
                }
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Whether an `ffmpeg -encoders` listing contains `encoder`
fn lists_encoder(listing: &str, encoder: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder))
}

/// Ask `program` whether it was built with `encoder`
fn encoder_supported(program: &Path, encoder: &str) -> bool {
    let output = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            lists_encoder(&String::from_utf8_lossy(&output.stdout), encoder)
        }
        Ok(output) => {
            tracing::warn!("{:?} -encoders exited with status {}", program, output.status);
            false
        }
        Err(e) => {
            tracing::warn!("Failed to run {:?}: {}", program, e);
            false
        }
    }
}

/// Opens [`FfmpegSink`]s
///
/// The encoder for each codec is looked up once; codecs the installed FFmpeg
/// cannot encode fail at `open` without touching the output directory.
#[derive(Debug)]
pub struct FfmpegSinkFactory {
    program: PathBuf,
    encoders: Mutex<HashMap<VideoCodec, bool>>,
}

impl FfmpegSinkFactory {
    pub fn new() -> Self {
        Self::with_program(FFMPEG)
    }

    /// Use `program` instead of `ffmpeg` from the PATH
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            encoders: Mutex::new(HashMap::new()),
        }
    }

    fn check_encoder(&self, codec: VideoCodec) -> SinkResult<()> {
        let encoder = codec.ffmpeg_encoder();
        let supported = *self.encoders.lock().entry(codec).or_insert_with(|| {
            let supported = encoder_supported(&self.program, encoder);
            if !supported {
                tracing::warn!("{:?} cannot encode {}", self.program, encoder);
            }
            supported
        });

        if supported {
            Ok(())
        } else {
            Err(SinkError::Encoder(format!(
                "Encoder {} is not available in {:?}",
                encoder, self.program
            )))
        }
    }
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&self, spec: &SinkSpec) -> SinkResult<Box<dyn VideoSink>> {
        self.check_encoder(spec.codec)?;
        Ok(Box::new(FfmpegSink::open_with(&self.program, spec)?))
    }
}
