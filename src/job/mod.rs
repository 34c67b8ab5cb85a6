//! Asynchronous transcription jobs: state machine, registry, orchestration.
//!
//! One job is one audio-to-clips pipeline run. The registry is the shared
//! in-memory table observers poll; the orchestrator spawns one execution
//! task per job and converts every outcome into a terminal state.

pub mod orchestrator;
pub mod registry;
pub mod state;

pub use orchestrator::JobOrchestrator;
pub use registry::JobRegistry;
pub use state::{JobSnapshot, JobStatus, transcribe_progress};
