//! Request handler implementation for the daemon.

use crate::api::protocol::{ClipInfo, JobInfo, ProfileInfo, Request, Response};
use crate::api::server::RequestHandler;
use crate::app::AppState;
use crate::error::ClipdexError;
use crate::export;
use crate::search;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use uuid::Uuid;

/// Request handler over the daemon's shared state.
pub struct ApiHandler {
    state: Arc<AppState>,
}

impl ApiHandler {
    /// Creates a new request handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn error(e: impl std::fmt::Display) -> Response {
        Response::Error {
            message: e.to_string(),
        }
    }

    async fn create_profile(&self, name: String) -> Response {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Self::error("profile name is empty");
        }
        match self.state.data.create_profile(&name) {
            Ok(profile) => Response::Profile {
                profile: ProfileInfo::from(profile),
            },
            Err(e) => Self::error(e),
        }
    }

    fn list_profiles(&self) -> Response {
        Response::Profiles {
            profiles: self
                .state
                .data
                .profiles()
                .into_iter()
                .map(ProfileInfo::from)
                .collect(),
        }
    }

    /// Delete a profile; clips, referenced uploads, and cached clip audio
    /// all go with it.
    async fn delete_profile(&self, profile_id: Uuid) -> Response {
        let cascade = match self.state.data.delete_profile(&profile_id) {
            Ok(cascade) => cascade,
            Err(e) => return Self::error(e),
        };

        for clip in &cascade.clips {
            export::remove_cached_cuts(&self.state.cache_dir, &clip.id);
        }
        for audio in &cascade.audios {
            if let Err(e) = self.state.audio.remove_file(audio.id) {
                log::warn!("could not remove upload for audio {}: {e}", audio.id);
            }
        }

        Response::Deleted {
            deleted: cascade.clips.len(),
        }
    }

    /// Store the upload and launch a transcription job for it.
    async fn submit(&self, profile_id: Uuid, filename: String, audio_base64: String) -> Response {
        if !self.state.data.profile_exists(&profile_id) {
            return Self::error(ClipdexError::ProfileNotFound {
                id: profile_id.to_string(),
            });
        }

        let bytes = match BASE64.decode(audio_base64.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => return Self::error(format!("invalid audio payload: {e}")),
        };

        let store = Arc::clone(&self.state.audio);
        let stored = tokio::task::spawn_blocking(move || store.store(profile_id, &filename, &bytes))
            .await
            .map_err(|e| ClipdexError::Other(format!("upload task failed: {e}")));
        let record = match stored {
            Ok(Ok(record)) => record,
            Ok(Err(e)) | Err(e) => return Self::error(e),
        };

        let job_id = self.state.orchestrator.submit(profile_id, record.id);
        Response::Submitted {
            job_id,
            audio: record.into(),
        }
    }

    fn job_status(&self, job_id: Uuid) -> Response {
        match self.state.orchestrator.registry().get(&job_id) {
            Some(snapshot) => Response::Job {
                job: JobInfo::from(snapshot),
            },
            None => Self::error(ClipdexError::JobNotFound {
                id: job_id.to_string(),
            }),
        }
    }

    fn list_jobs(&self) -> Response {
        Response::Jobs {
            jobs: self
                .state
                .orchestrator
                .registry()
                .jobs()
                .into_iter()
                .map(JobInfo::from)
                .collect(),
        }
    }

    fn cancel_job(&self, job_id: Uuid) -> Response {
        match self.state.orchestrator.registry().cancel(&job_id) {
            Ok(()) => Response::Ok,
            Err(e) => Self::error(e),
        }
    }

    fn search(
        &self,
        query: String,
        profile_id: Option<Uuid>,
        mode: search::SearchMode,
        limit: Option<usize>,
    ) -> Response {
        let clips = self.state.data.clips(profile_id.as_ref());
        let limit = limit.unwrap_or(self.state.config.search.default_limit);
        let results = search::search(clips, &query, mode, limit);
        Response::SearchResults {
            results: results.into_iter().map(ClipInfo::from).collect(),
        }
    }

    async fn delete_clip(&self, clip_id: Uuid) -> Response {
        match self.state.data.delete_clip(&clip_id) {
            Ok(_) => {
                export::remove_cached_cuts(&self.state.cache_dir, &clip_id);
                Response::Deleted { deleted: 1 }
            }
            Err(e) => Self::error(e),
        }
    }

    async fn bulk_delete_clips(&self, clip_ids: Vec<Uuid>) -> Response {
        let removed = match self.state.data.delete_clips(&clip_ids) {
            Ok(removed) => removed,
            Err(e) => return Self::error(e),
        };
        for clip in &removed {
            export::remove_cached_cuts(&self.state.cache_dir, &clip.id);
        }
        Response::Deleted {
            deleted: removed.len(),
        }
    }

    async fn export_clip(&self, clip_id: Uuid) -> Response {
        let state = Arc::clone(&self.state);
        let exported = tokio::task::spawn_blocking(move || {
            export::export_clip(
                &state.data,
                state.audio.as_ref(),
                &state.cache_dir,
                &clip_id,
            )
        })
        .await
        .map_err(|e| ClipdexError::Other(format!("export task failed: {e}")));

        match exported {
            Ok(Ok(clip)) => Response::ClipAudio {
                path: clip.path.to_string_lossy().to_string(),
                filename: clip.filename,
            },
            Ok(Err(e)) | Err(e) => Self::error(e),
        }
    }

    fn status(&self) -> Response {
        let registry = self.state.orchestrator.registry();
        Response::Status {
            model_name: self.state.transcriber.model_name().to_string(),
            model_ready: self.state.transcriber.is_ready(),
            jobs_total: registry.len(),
            jobs_active: registry.active(),
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for ApiHandler {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::CreateProfile { name } => self.create_profile(name).await,
            Request::ListProfiles => self.list_profiles(),
            Request::DeleteProfile { profile_id } => self.delete_profile(profile_id).await,
            Request::Submit {
                profile_id,
                filename,
                audio_base64,
            } => self.submit(profile_id, filename, audio_base64).await,
            Request::JobStatus { job_id } => self.job_status(job_id),
            Request::ListJobs => self.list_jobs(),
            Request::CancelJob { job_id } => self.cancel_job(job_id),
            Request::CancelAllJobs => Response::CancelledAll {
                cancelled: self.state.orchestrator.registry().cancel_all(),
            },
            Request::ClearJobs => {
                self.state.orchestrator.registry().clear();
                Response::Ok
            }
            Request::Search {
                query,
                profile_id,
                mode,
                limit,
            } => self.search(query, profile_id, mode, limit),
            Request::DeleteClip { clip_id } => self.delete_clip(clip_id).await,
            Request::BulkDeleteClips { clip_ids } => self.bulk_delete_clips(clip_ids).await,
            Request::ExportClip { clip_id } => self.export_clip(clip_id).await,
            Request::Status => self.status(),
            Request::Shutdown => {
                // The server's accept loop stops once this response is sent.
                Response::Ok
            }
        }
    }
}
