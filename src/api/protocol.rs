//! JSON message protocol between the CLI and the daemon.

use crate::job::state::{JobSnapshot, JobStatus};
use crate::search::SearchMode;
use crate::store::data::{AudioRecord, ClipRecord, ProfileRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requests sent by clients to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Create a profile
    CreateProfile { name: String },
    /// List all profiles
    ListProfiles,
    /// Delete a profile and everything scoped to it
    DeleteProfile { profile_id: Uuid },
    /// Store an upload and launch a transcription job for it
    Submit {
        profile_id: Uuid,
        filename: String,
        audio_base64: String,
    },
    /// Get one job's snapshot
    JobStatus { job_id: Uuid },
    /// List all job snapshots
    ListJobs,
    /// Request cancellation of one job
    CancelJob { job_id: Uuid },
    /// Request cancellation of every non-terminal job
    CancelAllJobs,
    /// Drop all job entries (administrative reset)
    ClearJobs,
    /// Search clips
    Search {
        query: String,
        #[serde(default)]
        profile_id: Option<Uuid>,
        #[serde(default)]
        mode: SearchMode,
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Delete one clip
    DeleteClip { clip_id: Uuid },
    /// Delete several clips at once
    BulkDeleteClips { clip_ids: Vec<Uuid> },
    /// Cut a clip's audio and name the download
    ExportClip { clip_id: Uuid },
    /// Get daemon status
    Status,
    /// Shut down the daemon
    Shutdown,
}

impl Request {
    /// Serialize request to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize request from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A profile as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for ProfileInfo {
    fn from(record: ProfileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
        }
    }
}

/// A stored upload as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub orig_filename: String,
    pub duration_s: f64,
    pub created_at: DateTime<Utc>,
}

impl From<AudioRecord> for AudioInfo {
    fn from(record: AudioRecord) -> Self {
        Self {
            id: record.id,
            profile_id: record.profile_id,
            orig_filename: record.orig_filename,
            duration_s: record.duration_s,
            created_at: record.created_at,
        }
    }
}

/// A job snapshot as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub clips_created: usize,
}

impl From<JobSnapshot> for JobInfo {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            id: snapshot.id,
            status: snapshot.status,
            progress: snapshot.progress,
            message: snapshot.message,
            clips_created: snapshot.clips_created,
        }
    }
}

/// A clip as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub audio_id: Uuid,
    pub start_s: f64,
    pub end_s: f64,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClipRecord> for ClipInfo {
    fn from(record: ClipRecord) -> Self {
        Self {
            id: record.id,
            profile_id: record.profile_id,
            audio_id: record.audio_id,
            start_s: record.start_s,
            end_s: record.end_s,
            transcript: record.transcript,
            created_at: record.created_at,
        }
    }
}

/// Responses sent by the daemon to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Request succeeded
    Ok,
    /// One profile
    Profile { profile: ProfileInfo },
    /// All profiles
    Profiles { profiles: Vec<ProfileInfo> },
    /// Upload stored, job launched
    Submitted { job_id: Uuid, audio: AudioInfo },
    /// One job snapshot
    Job { job: JobInfo },
    /// All job snapshots
    Jobs { jobs: Vec<JobInfo> },
    /// Result of a bulk cancel sweep
    CancelledAll { cancelled: usize },
    /// Search results, best first
    SearchResults { results: Vec<ClipInfo> },
    /// Number of records deleted
    Deleted { deleted: usize },
    /// Exported clip audio
    ClipAudio { path: String, filename: String },
    /// Daemon status
    Status {
        model_name: String,
        model_ready: bool,
        jobs_total: usize,
        jobs_active: usize,
    },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
