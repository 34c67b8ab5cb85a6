//! Job lifecycle states and snapshots.
//!
//! A job is one asynchronous run of the audio-to-clips pipeline:
//! `queued → running → {done | error | cancelled}`. The three right-hand
//! states are terminal; `queued → cancelled` is also legal when cancellation
//! arrives before execution begins.

use crate::defaults;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a job's externally visible state.
///
/// The registry replaces snapshots whole, so a snapshot handed to a caller
/// is never mutated behind its back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub status: JobStatus,
    /// 0–100, non-decreasing until a terminal state freezes it.
    pub progress: u8,
    /// Human-readable current-step description.
    pub message: String,
    /// Clips persisted so far (final count once terminal).
    pub clips_created: usize,
    pub created_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// Fresh snapshot for a newly submitted job.
    pub fn queued(id: Uuid, profile_id: Uuid) -> Self {
        Self {
            id,
            profile_id,
            status: JobStatus::Queued,
            progress: 0,
            message: "waiting".to_string(),
            clips_created: 0,
            created_at: Utc::now(),
        }
    }
}

/// Map transcriber completion `f ∈ [0,1]` into the job progress band.
///
/// Upload reporting owns 0–20 on the client side; the daemon's own progress
/// covers 20–100, so `f` lands on `20 + floor(f × 80)`, clamped to 100.
pub fn transcribe_progress(fraction: f32) -> u8 {
    let f = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mapped = defaults::TRANSCRIBE_PROGRESS_BASE as f32 + (f * 80.0).floor();
    mapped.min(100.0) as u8
}
