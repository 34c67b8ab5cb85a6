//! JSON-file persistence for profiles, audio records, and clips.
//!
//! One `data.json` holds everything, rewritten on every mutation. A corrupt
//! file is moved aside to `data.broken.<timestamp>.json` and replaced by an
//! empty store rather than refusing to start.

use crate::error::{ClipdexError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// A profile: one namespace scoping uploads and clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata for one stored upload; the bytes live under `uploads/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub orig_filename: String,
    /// File name inside the uploads directory.
    pub file_name: String,
    pub duration_s: f64,
    pub created_at: DateTime<Utc>,
}

/// One persisted transcript segment with precomputed search keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub audio_id: Uuid,
    pub start_s: f64,
    pub end_s: f64,
    pub transcript: String,
    /// Jamo-flattened transcript for basic search.
    pub norm: String,
    /// Pronunciation-normalized key for Korean sound search.
    pub ko_pron_norm: String,
    /// Hiragana key for Japanese sound search (empty if no kana).
    pub jp_kana_norm: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct DataFile {
    profiles: Vec<ProfileRecord>,
    audios: Vec<AudioRecord>,
    clips: Vec<ClipRecord>,
}

/// Records removed by a profile cascade delete, so the caller can unlink
/// the files they reference.
#[derive(Debug, Default)]
pub struct ProfileCascade {
    pub clips: Vec<ClipRecord>,
    pub audios: Vec<AudioRecord>,
}

/// Shared handle to the JSON data file.
pub struct DataStore {
    path: PathBuf,
    data: RwLock<DataFile>,
}

impl DataStore {
    /// Open (or create) the data file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = Self::load(&path);
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Load the data file; recover from corruption by moving the broken
    /// file aside and starting empty.
    fn load(path: &Path) -> DataFile {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return DataFile::default(),
        };
        if text.trim().is_empty() {
            return DataFile::default();
        }
        match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                let stamp = Utc::now().format("%Y%m%d_%H%M%S");
                let backup = path.with_file_name(format!("data.broken.{stamp}.json"));
                log::warn!(
                    "data file {} is corrupt ({}), moving aside to {}",
                    path.display(),
                    e,
                    backup.display()
                );
                if let Err(rename_err) = std::fs::rename(path, &backup) {
                    log::warn!("could not move corrupt data file aside: {rename_err}");
                }
                DataFile::default()
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DataFile> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DataFile> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, data: &DataFile) -> Result<()> {
        let json = serde_json::to_string_pretty(data).map_err(|e| ClipdexError::DataStore {
            message: format!("failed to serialize data file: {e}"),
        })?;
        std::fs::write(&self.path, json).map_err(|e| ClipdexError::DataStore {
            message: format!("failed to write {}: {e}", self.path.display()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Profiles ─────────────────────────────────────────────────────────

    pub fn create_profile(&self, name: &str) -> Result<ProfileRecord> {
        let profile = ProfileRecord {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        let mut data = self.write();
        data.profiles.push(profile.clone());
        self.save(&data)?;
        Ok(profile)
    }

    pub fn profiles(&self) -> Vec<ProfileRecord> {
        self.read().profiles.clone()
    }

    pub fn profile_exists(&self, id: &Uuid) -> bool {
        self.read().profiles.iter().any(|p| p.id == *id)
    }

    /// Delete a profile and everything scoped to it: its clips, the audio
    /// records those clips reference, and (via the returned cascade) the
    /// files behind them.
    pub fn delete_profile(&self, id: &Uuid) -> Result<ProfileCascade> {
        let mut data = self.write();
        if !data.profiles.iter().any(|p| p.id == *id) {
            return Err(ClipdexError::ProfileNotFound { id: id.to_string() });
        }

        let clips: Vec<ClipRecord> = data
            .clips
            .iter()
            .filter(|c| c.profile_id == *id)
            .cloned()
            .collect();
        let audio_ids: HashSet<Uuid> = clips.iter().map(|c| c.audio_id).collect();
        let audios: Vec<AudioRecord> = data
            .audios
            .iter()
            .filter(|a| audio_ids.contains(&a.id))
            .cloned()
            .collect();

        data.profiles.retain(|p| p.id != *id);
        data.clips.retain(|c| c.profile_id != *id);
        data.audios.retain(|a| !audio_ids.contains(&a.id));
        self.save(&data)?;

        Ok(ProfileCascade { clips, audios })
    }

    // ── Audio records ────────────────────────────────────────────────────

    pub fn add_audio(&self, record: AudioRecord) -> Result<()> {
        let mut data = self.write();
        data.audios.push(record);
        self.save(&data)
    }

    pub fn audio(&self, id: &Uuid) -> Option<AudioRecord> {
        self.read().audios.iter().find(|a| a.id == *id).cloned()
    }

    pub fn remove_audio(&self, id: &Uuid) -> Result<()> {
        let mut data = self.write();
        data.audios.retain(|a| a.id != *id);
        self.save(&data)
    }

    // ── Clips ────────────────────────────────────────────────────────────

    /// Append one clip and write it through immediately, so each persisted
    /// clip is durable on its own.
    pub fn add_clip(&self, record: ClipRecord) -> Result<()> {
        let mut data = self.write();
        data.clips.push(record);
        self.save(&data)
    }

    pub fn clip(&self, id: &Uuid) -> Option<ClipRecord> {
        self.read().clips.iter().find(|c| c.id == *id).cloned()
    }

    /// All clips, optionally scoped to one profile.
    pub fn clips(&self, profile_id: Option<&Uuid>) -> Vec<ClipRecord> {
        self.read()
            .clips
            .iter()
            .filter(|c| profile_id.is_none_or(|p| c.profile_id == *p))
            .cloned()
            .collect()
    }

    pub fn delete_clip(&self, id: &Uuid) -> Result<ClipRecord> {
        let mut data = self.write();
        let Some(pos) = data.clips.iter().position(|c| c.id == *id) else {
            return Err(ClipdexError::ClipNotFound { id: id.to_string() });
        };
        let removed = data.clips.remove(pos);
        self.save(&data)?;
        Ok(removed)
    }

    /// Delete many clips at once; duplicate ids are collapsed. Returns the
    /// records actually removed (missing ids are skipped, not errors).
    pub fn delete_clips(&self, ids: &[Uuid]) -> Result<Vec<ClipRecord>> {
        let id_set: HashSet<Uuid> = ids.iter().copied().collect();
        if id_set.is_empty() {
            return Ok(Vec::new());
        }
        let mut data = self.write();
        let removed: Vec<ClipRecord> = data
            .clips
            .iter()
            .filter(|c| id_set.contains(&c.id))
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        data.clips.retain(|c| !id_set.contains(&c.id));
        self.save(&data)?;
        Ok(removed)
    }
}
