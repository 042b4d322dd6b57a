//! Chunk file naming
//!
//! Chunks are named `cam<id>_<YYYYMMDD_HHMMSS>.<ext>` after the camera and the
//! second the chunk started. When that name is already taken on disk a
//! counter suffix is appended: `cam<id>_<YYYYMMDD_HHMMSS>_1.<ext>`, `_2`, ...

use super::sink::VideoCodec;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// strftime pattern of the chunk start timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Make a camera id safe to embed in a file name
fn sanitize_camera_id(camera_id: &str) -> String {
    camera_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// File name for a chunk; `suffix == 0` means no collision counter
pub fn chunk_file_name(
    camera_id: &str,
    started_at: &DateTime<Local>,
    codec: VideoCodec,
    suffix: u32,
) -> String {
    let stamp = started_at.format(TIMESTAMP_FORMAT);
    let camera = sanitize_camera_id(camera_id);
    if suffix == 0 {
        format!("cam{}_{}.{}", camera, stamp, codec.extension())
    } else {
        format!("cam{}_{}_{}.{}", camera, stamp, suffix, codec.extension())
    }
}

/// First free chunk path in `dir` for a chunk starting at `started_at`
pub fn next_chunk_path(
    dir: &Path,
    camera_id: &str,
    started_at: &DateTime<Local>,
    codec: VideoCodec,
) -> PathBuf {
    let mut suffix = 0;
    loop {
        let candidate = dir.join(chunk_file_name(camera_id, started_at, codec, suffix));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}
