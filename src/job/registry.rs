//! In-memory job table shared between the API and running executions.
//!
//! The registry is the single source of truth for job state. Readers always
//! get a cloned snapshot; the only writer of a job's status/progress is that
//! job's own execution task, which replaces the snapshot whole under the
//! write lock so concurrent polls never observe a torn record. The
//! cancellation flag is a separate set-once atomic any caller may flip.
//!
//! Entries are never evicted automatically: terminal jobs stay visible until
//! an explicit [`JobRegistry::clear`], so late polls still see the outcome.

use crate::error::{ClipdexError, Result};
use crate::job::state::JobSnapshot;
use crate::stt::transcriber::CancelToken;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

struct JobEntry {
    snapshot: JobSnapshot,
    cancel: Arc<AtomicBool>,
}

/// Table of all jobs submitted during this process's lifetime.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, JobEntry>> {
        // A panicked writer cannot leave a snapshot half-replaced, so the
        // map stays usable after poisoning.
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, JobEntry>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a freshly queued job and hand back its cancellation token.
    ///
    /// Job ids are random v4 UUIDs assigned at submission; an id is never
    /// reused, so an insert never displaces a live entry.
    pub fn insert(&self, snapshot: JobSnapshot) -> CancelToken {
        let cancel = Arc::new(AtomicBool::new(false));
        let token = CancelToken::from_flag(Arc::clone(&cancel));
        self.write()
            .insert(snapshot.id, JobEntry { snapshot, cancel });
        token
    }

    /// Snapshot of one job, or None for an unknown id.
    pub fn get(&self, id: &Uuid) -> Option<JobSnapshot> {
        self.read().get(id).map(|entry| entry.snapshot.clone())
    }

    /// Snapshots of every job, newest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<JobSnapshot> = self
            .read()
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of jobs not yet in a terminal state.
    pub fn active(&self) -> usize {
        self.read()
            .values()
            .filter(|entry| !entry.snapshot.status.is_terminal())
            .count()
    }

    /// Request cancellation of one job.
    ///
    /// Idempotent: cancelling an already-terminal or already-flagged job
    /// succeeds without changing anything. Only an unknown id is an error.
    pub fn cancel(&self, id: &Uuid) -> Result<()> {
        let jobs = self.read();
        let entry = jobs.get(id).ok_or_else(|| ClipdexError::JobNotFound {
            id: id.to_string(),
        })?;
        if !entry.snapshot.status.is_terminal() {
            entry.cancel.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Best-effort sweep: flag every non-terminal job for cancellation.
    ///
    /// Returns how many jobs were newly flagged. Individual jobs that race
    /// into a terminal state are simply skipped, never abort the sweep.
    pub fn cancel_all(&self) -> usize {
        let jobs = self.read();
        let mut flagged = 0;
        for entry in jobs.values() {
            if entry.snapshot.status.is_terminal() {
                continue;
            }
            if !entry.cancel.swap(true, Ordering::SeqCst) {
                flagged += 1;
            }
        }
        flagged
    }

    /// Whether cancellation has been requested for a job.
    pub fn cancel_requested(&self, id: &Uuid) -> bool {
        self.read()
            .get(id)
            .is_some_and(|entry| entry.cancel.load(Ordering::SeqCst))
    }

    /// Drop every entry. Administrative reset only; running executions keep
    /// going but publish into the void.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Apply an update to a job's snapshot as one atomic replacement.
    ///
    /// Writes against a terminal snapshot are ignored (nothing leaves a
    /// terminal state) and progress can only grow, clamped to 100. A missing
    /// entry (cleared mid-flight) is a no-op.
    pub(crate) fn publish(&self, id: &Uuid, update: impl FnOnce(&mut JobSnapshot)) {
        let mut jobs = self.write();
        let Some(entry) = jobs.get_mut(id) else {
            return;
        };
        if entry.snapshot.status.is_terminal() {
            return;
        }

        let mut next = entry.snapshot.clone();
        update(&mut next);
        next.progress = next.progress.max(entry.snapshot.progress).min(100);
        // Identity fields are immutable after creation.
        next.id = entry.snapshot.id;
        next.profile_id = entry.snapshot.profile_id;
        next.created_at = entry.snapshot.created_at;
        entry.snapshot = next;
    }
}
