//! clipdex - searchable voice clips
//!
//! Upload audio against a profile, transcribe it as an asynchronous,
//! cancellable job, and search the resulting clips.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod api;
pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod export;
pub mod job;
pub mod search;
pub mod store;
pub mod stt;

// Core traits (stores → transcriber → clips)
pub use store::audio_store::AudioStore;
pub use store::clip_index::ClipIndex;
pub use stt::transcriber::Transcriber;

// Job orchestration
pub use job::orchestrator::JobOrchestrator;
pub use job::registry::JobRegistry;
pub use job::state::{JobSnapshot, JobStatus};

// Error handling
pub use error::{ClipdexError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
