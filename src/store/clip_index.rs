//! Clip persistence for finished transcriptions.
//!
//! Each segment is written through individually, so everything persisted
//! before a mid-batch failure stays durable. Partial failure is reported,
//! not rolled back: saved clips are independently useful and remain
//! queryable while the owning job ends in `error`.

use crate::defaults;
use crate::error::{ClipdexError, Result};
use crate::search;
use crate::store::data::{ClipRecord, DataStore};
use crate::stt::transcriber::Segment;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Trait for persisting transcript segments as searchable clips.
pub trait ClipIndex: Send + Sync {
    /// Persist segments for a profile, returning the created clip ids in
    /// segment order.
    ///
    /// On partial failure returns `ClipdexError::ClipPersist` carrying how
    /// many clips made it; those stay durable.
    fn persist(&self, profile_id: Uuid, audio_id: Uuid, segments: &[Segment]) -> Result<Vec<Uuid>>;
}

/// Whether a segment carries enough content to become a clip.
pub fn segment_is_usable(segment: &Segment) -> bool {
    !segment.text.trim().is_empty() && segment.duration_s() >= defaults::MIN_SEGMENT_SECS
}

/// Build the persisted record for one segment, search keys included.
fn clip_record(profile_id: Uuid, audio_id: Uuid, segment: &Segment) -> ClipRecord {
    let text = segment.text.trim();
    ClipRecord {
        id: Uuid::new_v4(),
        profile_id,
        audio_id,
        start_s: segment.start_s,
        end_s: segment.end_s,
        transcript: text.to_string(),
        norm: search::norm_basic(text),
        ko_pron_norm: search::korean::norm_ko_sound(text),
        jp_kana_norm: search::japanese::jp_kana_norm(text),
        created_at: Utc::now(),
    }
}

/// Clip index backed by the JSON data store.
pub struct JsonClipIndex {
    data: Arc<DataStore>,
}

impl JsonClipIndex {
    pub fn new(data: Arc<DataStore>) -> Self {
        Self { data }
    }
}

impl ClipIndex for JsonClipIndex {
    fn persist(&self, profile_id: Uuid, audio_id: Uuid, segments: &[Segment]) -> Result<Vec<Uuid>> {
        let total = segments.len();
        let mut created = Vec::with_capacity(total);

        for segment in segments {
            let record = clip_record(profile_id, audio_id, segment);
            let id = record.id;
            if let Err(e) = self.data.add_clip(record) {
                return Err(ClipdexError::ClipPersist {
                    persisted: created.len(),
                    total,
                    message: e.to_string(),
                });
            }
            created.push(id);
        }

        Ok(created)
    }
}

/// Recording clip index for tests: captures every persisted segment and can
/// inject a failure partway through a batch.
#[derive(Default)]
pub struct MockClipIndex {
    persisted: Mutex<Vec<(Uuid, Uuid, Segment)>>,
    fail_after: Option<usize>,
}

impl MockClipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the batch once this many segments have been persisted.
    pub fn failing_after(count: usize) -> Self {
        Self {
            persisted: Mutex::new(Vec::new()),
            fail_after: Some(count),
        }
    }

    /// Segments persisted so far as (profile_id, audio_id, segment).
    pub fn persisted(&self) -> Vec<(Uuid, Uuid, Segment)> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persisted segment texts for one profile.
    pub fn texts_for(&self, profile_id: Uuid) -> Vec<String> {
        self.persisted()
            .into_iter()
            .filter(|(p, _, _)| *p == profile_id)
            .map(|(_, _, segment)| segment.text)
            .collect()
    }
}

impl ClipIndex for MockClipIndex {
    fn persist(&self, profile_id: Uuid, audio_id: Uuid, segments: &[Segment]) -> Result<Vec<Uuid>> {
        let total = segments.len();
        let mut created = Vec::with_capacity(total);
        let mut persisted = self
            .persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        for segment in segments {
            if self.fail_after == Some(created.len()) {
                return Err(ClipdexError::ClipPersist {
                    persisted: created.len(),
                    total,
                    message: "mock persistence failure".to_string(),
                });
            }
            persisted.push((profile_id, audio_id, segment.clone()));
            created.push(Uuid::new_v4());
        }

        Ok(created)
    }
}
