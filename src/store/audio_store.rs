//! Durable storage for uploaded audio.
//!
//! Uploads are validated and measured at store time, written under the
//! uploads directory, and registered in the data file. Jobs fetch decoded
//! samples back by audio id.

use crate::audio::wav::{DecodedAudio, decode_wav_bytes, decode_wav_file};
use crate::error::{ClipdexError, Result};
use crate::store::data::{AudioRecord, DataStore};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Trait for audio persistence.
///
/// This trait allows swapping implementations (filesystem vs in-memory mock).
pub trait AudioStore: Send + Sync {
    /// Validate and durably store uploaded bytes for a profile.
    fn store(&self, profile_id: Uuid, orig_filename: &str, bytes: &[u8]) -> Result<AudioRecord>;

    /// Decode a stored upload back to 16kHz mono samples.
    ///
    /// Fails with `AudioNotFound` if the record or the underlying file is
    /// gone.
    fn fetch(&self, audio_id: Uuid) -> Result<DecodedAudio>;

    /// Path of the stored source file (for clip extraction).
    fn source_path(&self, audio_id: Uuid) -> Result<PathBuf>;

    /// Remove the stored file for an audio id. Missing files are fine.
    fn remove_file(&self, audio_id: Uuid) -> Result<()>;
}

/// Filesystem-backed audio store.
pub struct FsAudioStore {
    uploads_dir: PathBuf,
    data: Arc<DataStore>,
}

impl FsAudioStore {
    pub fn new(uploads_dir: impl Into<PathBuf>, data: Arc<DataStore>) -> Result<Self> {
        let uploads_dir = uploads_dir.into();
        std::fs::create_dir_all(&uploads_dir)?;
        Ok(Self { uploads_dir, data })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    fn record(&self, audio_id: &Uuid) -> Result<AudioRecord> {
        self.data
            .audio(audio_id)
            .ok_or_else(|| ClipdexError::AudioNotFound {
                id: audio_id.to_string(),
            })
    }
}

/// Lowercased extension of a filename, including the dot.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

impl AudioStore for FsAudioStore {
    fn store(&self, profile_id: Uuid, orig_filename: &str, bytes: &[u8]) -> Result<AudioRecord> {
        let extension = extension_of(orig_filename);
        if extension != ".wav" {
            return Err(ClipdexError::UnsupportedAudioFormat { extension });
        }

        // Decode up front: rejects junk uploads and measures duration.
        let decoded = decode_wav_bytes(bytes)?;

        let id = Uuid::new_v4();
        let file_name = format!("{id}.wav");
        let path = self.uploads_dir.join(&file_name);
        std::fs::write(&path, bytes)?;

        let record = AudioRecord {
            id,
            profile_id,
            orig_filename: orig_filename.to_string(),
            file_name,
            duration_s: decoded.duration_s,
            created_at: Utc::now(),
        };
        if let Err(e) = self.data.add_audio(record.clone()) {
            // Keep the uploads dir consistent with the data file.
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(record)
    }

    fn fetch(&self, audio_id: Uuid) -> Result<DecodedAudio> {
        let record = self.record(&audio_id)?;
        let path = self.uploads_dir.join(&record.file_name);
        if !path.exists() {
            return Err(ClipdexError::AudioNotFound {
                id: audio_id.to_string(),
            });
        }
        decode_wav_file(&path)
    }

    fn source_path(&self, audio_id: Uuid) -> Result<PathBuf> {
        let record = self.record(&audio_id)?;
        let path = self.uploads_dir.join(&record.file_name);
        if !path.exists() {
            return Err(ClipdexError::AudioNotFound {
                id: audio_id.to_string(),
            });
        }
        Ok(path)
    }

    fn remove_file(&self, audio_id: Uuid) -> Result<()> {
        if let Some(record) = self.data.audio(&audio_id) {
            let path = self.uploads_dir.join(&record.file_name);
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// In-memory audio store for testing the job pipeline without disk I/O.
#[derive(Default)]
pub struct MockAudioStore {
    audios: Mutex<HashMap<Uuid, DecodedAudio>>,
}

impl MockAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register samples under a fresh audio id and return the id.
    pub fn add_samples(&self, samples: Vec<i16>) -> Uuid {
        let id = Uuid::new_v4();
        let duration_s = samples.len() as f64 / crate::defaults::SAMPLE_RATE as f64;
        self.audios
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                DecodedAudio {
                    samples,
                    duration_s,
                },
            );
        id
    }
}

impl AudioStore for MockAudioStore {
    fn store(&self, profile_id: Uuid, orig_filename: &str, bytes: &[u8]) -> Result<AudioRecord> {
        let decoded = decode_wav_bytes(bytes)?;
        let id = self.add_samples(decoded.samples.clone());
        Ok(AudioRecord {
            id,
            profile_id,
            orig_filename: orig_filename.to_string(),
            file_name: format!("{id}.wav"),
            duration_s: decoded.duration_s,
            created_at: Utc::now(),
        })
    }

    fn fetch(&self, audio_id: Uuid) -> Result<DecodedAudio> {
        self.audios
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&audio_id)
            .cloned()
            .ok_or_else(|| ClipdexError::AudioNotFound {
                id: audio_id.to_string(),
            })
    }

    fn source_path(&self, audio_id: Uuid) -> Result<PathBuf> {
        Err(ClipdexError::AudioNotFound {
            id: audio_id.to_string(),
        })
    }

    fn remove_file(&self, audio_id: Uuid) -> Result<()> {
        self.audios
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&audio_id);
        Ok(())
    }
}
