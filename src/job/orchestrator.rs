//! Job orchestration: one execution task per submitted upload.
//!
//! `submit` registers a queued job and spawns its pipeline
//! (fetch audio → transcribe → persist clips) without blocking the caller.
//! The execution task is the only writer of its job's status and progress;
//! cancellation is cooperative through the job's cancel token, observed at
//! transcriber checkpoints and once more before clips are persisted.
//!
//! Every failure mode, including a panicking blocking task, lands the job in
//! a terminal state. A job is never left `running` by a fault.

use crate::defaults;
use crate::error::{ClipdexError, Result};
use crate::job::registry::JobRegistry;
use crate::job::state::{JobSnapshot, JobStatus, transcribe_progress};
use crate::store::audio_store::AudioStore;
use crate::store::clip_index::{ClipIndex, segment_is_usable};
use crate::stt::transcriber::{CancelToken, Segment, Transcriber};
use std::sync::Arc;
use uuid::Uuid;

/// Owns the job table and the collaborators each execution needs.
pub struct JobOrchestrator {
    registry: Arc<JobRegistry>,
    audio: Arc<dyn AudioStore>,
    transcriber: Arc<dyn Transcriber>,
    clips: Arc<dyn ClipIndex>,
}

impl JobOrchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        audio: Arc<dyn AudioStore>,
        transcriber: Arc<dyn Transcriber>,
        clips: Arc<dyn ClipIndex>,
    ) -> Self {
        Self {
            registry,
            audio,
            transcriber,
            clips,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Create a queued job for a stored upload and launch its execution.
    ///
    /// Returns the job id immediately; progress is observed through the
    /// registry. Profile existence is the caller's concern.
    pub fn submit(&self, profile_id: Uuid, audio_id: Uuid) -> Uuid {
        let snapshot = JobSnapshot::queued(Uuid::new_v4(), profile_id);
        let job_id = snapshot.id;
        let cancel = self.registry.insert(snapshot);

        let run = JobRun {
            registry: Arc::clone(&self.registry),
            audio: Arc::clone(&self.audio),
            transcriber: Arc::clone(&self.transcriber),
            clips: Arc::clone(&self.clips),
            job_id,
            profile_id,
            audio_id,
            cancel,
        };
        log::info!("job {job_id}: submitted for profile {profile_id}");
        tokio::spawn(run.run());
        job_id
    }
}

/// Everything one execution task needs, detached from the orchestrator so
/// submission never blocks on running work.
struct JobRun {
    registry: Arc<JobRegistry>,
    audio: Arc<dyn AudioStore>,
    transcriber: Arc<dyn Transcriber>,
    clips: Arc<dyn ClipIndex>,
    job_id: Uuid,
    profile_id: Uuid,
    audio_id: Uuid,
    cancel: CancelToken,
}

impl JobRun {
    /// Drive the pipeline and convert its outcome into a terminal state.
    async fn run(self) {
        let job_id = self.job_id;
        let outcome = self.execute().await;
        match outcome {
            Ok(finished) => {
                self.registry.publish(&job_id, |job| {
                    job.status = JobStatus::Done;
                    job.progress = 100;
                    job.clips_created = finished.clips_created;
                    job.message = format!("done ({} clips)", finished.clips_created);
                });
                log::info!("job {job_id}: done with {} clips", finished.clips_created);
            }
            Err(ClipdexError::TranscriptionCancelled) => {
                // Progress stays frozen at the last computed value.
                self.registry.publish(&job_id, |job| {
                    job.status = JobStatus::Cancelled;
                    job.message = "cancelled".to_string();
                });
                log::info!("job {job_id}: cancelled");
            }
            Err(ClipdexError::ClipPersist {
                persisted,
                total,
                message,
            }) => {
                self.registry.publish(&job_id, |job| {
                    job.status = JobStatus::Error;
                    job.clips_created = persisted;
                    job.message =
                        format!("persisted {persisted} of {total} clips before failure: {message}");
                });
                log::warn!("job {job_id}: partial clip persistence ({persisted}/{total})");
            }
            Err(e) => {
                self.registry.publish(&job_id, |job| {
                    job.status = JobStatus::Error;
                    job.message = e.to_string();
                });
                log::warn!("job {job_id}: failed: {e}");
            }
        }
    }

    /// The pipeline proper. Any `Err` other than `TranscriptionCancelled`
    /// and `ClipPersist` becomes a plain `error` outcome in [`Self::run`].
    async fn execute(&self) -> Result<Finished> {
        // Cancellation may land before the task ever runs: queued → cancelled
        // without passing through running.
        if self.cancel.is_cancelled() {
            return Err(ClipdexError::TranscriptionCancelled);
        }

        self.registry.publish(&self.job_id, |job| {
            job.status = JobStatus::Running;
            job.progress = defaults::TRANSCRIBE_PROGRESS_BASE;
            job.message = "fetching audio".to_string();
        });

        let audio = {
            let store = Arc::clone(&self.audio);
            let audio_id = self.audio_id;
            tokio::task::spawn_blocking(move || store.fetch(audio_id))
                .await
                .map_err(|e| ClipdexError::Other(format!("audio fetch task failed: {e}")))??
        };

        let segments = self.transcribe(audio.samples).await?;

        // Final checkpoint: a cancel that raced transcriber completion still
        // wins, and no clips are persisted for a cancelled job.
        if self.cancel.is_cancelled() {
            return Err(ClipdexError::TranscriptionCancelled);
        }

        let usable: Vec<Segment> = segments.into_iter().filter(segment_is_usable).collect();

        self.registry.publish(&self.job_id, |job| {
            job.message = format!("saving {} clips", usable.len());
        });

        let created = {
            let clips = Arc::clone(&self.clips);
            let profile_id = self.profile_id;
            let audio_id = self.audio_id;
            tokio::task::spawn_blocking(move || clips.persist(profile_id, audio_id, &usable))
                .await
                .map_err(|e| ClipdexError::Other(format!("clip persistence task failed: {e}")))??
        };

        Ok(Finished {
            clips_created: created.len(),
        })
    }

    /// Run the transcriber on a blocking thread, publishing mapped progress
    /// from its callbacks.
    async fn transcribe(&self, samples: Vec<i16>) -> Result<Vec<Segment>> {
        let registry = Arc::clone(&self.registry);
        let transcriber = Arc::clone(&self.transcriber);
        let cancel = self.cancel.clone();
        let job_id = self.job_id;

        tokio::task::spawn_blocking(move || {
            let mut on_progress = |fraction: f32| {
                let progress = transcribe_progress(fraction);
                registry.publish(&job_id, |job| {
                    job.progress = progress;
                    job.message = "transcribing".to_string();
                });
            };
            transcriber.run(&samples, &mut on_progress, &cancel)
        })
        .await
        .map_err(|e| ClipdexError::TranscriptionFailed {
            message: format!("transcription task panicked: {e}"),
        })?
    }
}

struct Finished {
    clips_created: usize,
}
