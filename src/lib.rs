//! Multi-camera recorder - chunked, capped recording sessions per camera.
//!
//! This is the library crate behind the `multicam-recorder` binary. It
//! provides camera capture, the per-camera recording sessions and their
//! registry, and the settings store.

pub mod capture;
pub mod recorder;
pub mod settings;
pub mod utils;

pub use recorder::{RecordingEvent, RecordingSession, SessionConfig, SessionRegistry};
pub use settings::Settings;
pub use utils::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multicam_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
