//! Clip audio export: on-demand WAV extraction with friendly filenames.
//!
//! A clip's audio is cut from its source upload the first time it is
//! exported and cached under `clips_cache/`; the download filename is the
//! transcript, sanitized for filesystems, with " (2)"-style suffixes when
//! several clips share a transcript.

use crate::audio::wav::extract_clip_wav;
use crate::defaults;
use crate::error::{ClipdexError, Result};
use crate::store::audio_store::AudioStore;
use crate::store::data::{ClipRecord, DataStore};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sanitize a transcript into a filename base.
///
/// Collapses whitespace, strips characters Windows and browsers reject,
/// trims trailing dots/spaces, and caps the length (on a char boundary).
/// Falls back to `fallback` when nothing survives.
pub fn make_safe_filename(base: &str, fallback: &str, max_len: usize) -> String {
    const FORBIDDEN: &str = "\\/:*?\"<>|";

    let mut out = String::new();
    let mut last_was_space = false;
    for ch in base.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        if FORBIDDEN.contains(ch) {
            continue;
        }
        out.push(ch);
    }

    let mut out: String = out.trim_matches([' ', '.']).to_string();
    if out.chars().count() > max_len {
        out = out.chars().take(max_len).collect();
        out = out.trim_end_matches([' ', '.']).to_string();
    }

    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}

/// Download filename for a clip, disambiguated among clips that share the
/// same sanitized transcript: the 2nd and later get " (2)", " (3)", …
/// ordered stably by (created_at, id).
pub fn download_name(clip: &ClipRecord, all_clips: &[ClipRecord]) -> String {
    let safe_base = make_safe_filename(&clip.transcript, "clip", defaults::MAX_DOWNLOAD_NAME_LEN);

    let mut same: Vec<&ClipRecord> = all_clips
        .iter()
        .filter(|c| {
            make_safe_filename(&c.transcript, "clip", defaults::MAX_DOWNLOAD_NAME_LEN) == safe_base
        })
        .collect();
    same.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let position = same.iter().position(|c| c.id == clip.id).map(|i| i + 1);

    match position {
        Some(n) if n > 1 => format!("{safe_base} ({n}).wav"),
        _ => format!("{safe_base}.wav"),
    }
}

/// Cache file name for a clip cut; encodes the time range so edits to clip
/// bounds produce a different cache entry.
fn cache_file_name(clip: &ClipRecord) -> String {
    format!("{}_{:.3}_{:.3}.wav", clip.id, clip.start_s, clip.end_s)
}

/// An exported clip: where the cut WAV lives and what to call the download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedClip {
    pub path: PathBuf,
    pub filename: String,
}

/// Cut (or reuse a cached cut of) a clip's audio and name the download.
pub fn export_clip(
    data: &DataStore,
    audio: &dyn AudioStore,
    cache_dir: &Path,
    clip_id: &Uuid,
) -> Result<ExportedClip> {
    let clip = data.clip(clip_id).ok_or_else(|| ClipdexError::ClipNotFound {
        id: clip_id.to_string(),
    })?;

    let cache_path = cache_dir.join(cache_file_name(&clip));
    if !cache_path.exists() {
        let source = audio.source_path(clip.audio_id)?;
        extract_clip_wav(&source, clip.start_s, clip.end_s, &cache_path)?;
    }

    let filename = download_name(&clip, &data.clips(None));
    Ok(ExportedClip {
        path: cache_path,
        filename,
    })
}

/// Remove any cached cuts for a clip id (called when clips are deleted).
pub fn remove_cached_cuts(cache_dir: &Path, clip_id: &Uuid) {
    let prefix = format!("{clip_id}_");
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::audio_store::FsAudioStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_safe_filename_collapses_whitespace() {
        assert_eq!(make_safe_filename("  hello   world  ", "clip", 80), "hello world");
    }

    #[test]
    fn test_safe_filename_strips_forbidden_chars() {
        assert_eq!(
            make_safe_filename("a\\b/c:d*e?f\"g<h>i|j", "clip", 80),
            "abcdefghij"
        );
    }

    #[test]
    fn test_safe_filename_trims_trailing_dots() {
        assert_eq!(make_safe_filename("name...", "clip", 80), "name");
        assert_eq!(make_safe_filename(". .", "clip", 80), "clip");
    }

    #[test]
    fn test_safe_filename_falls_back_when_empty() {
        assert_eq!(make_safe_filename("", "clip", 80), "clip");
        assert_eq!(make_safe_filename("///???", "fallback", 80), "fallback");
    }

    #[test]
    fn test_safe_filename_caps_length_on_char_boundary() {
        let long = "가".repeat(100);
        let result = make_safe_filename(&long, "clip", 80);
        assert_eq!(result.chars().count(), 80);
    }

    #[test]
    fn test_safe_filename_keeps_unicode() {
        assert_eq!(make_safe_filename("안녕하세요", "clip", 80), "안녕하세요");
    }

    fn clip_with(transcript: &str, age_secs: i64) -> ClipRecord {
        ClipRecord {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            audio_id: Uuid::new_v4(),
            start_s: 0.0,
            end_s: 1.0,
            transcript: transcript.to_string(),
            norm: String::new(),
            ko_pron_norm: String::new(),
            jp_kana_norm: String::new(),
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_download_name_unique_transcript() {
        let clip = clip_with("only one", 0);
        let all = vec![clip.clone()];
        assert_eq!(download_name(&clip, &all), "only one.wav");
    }

    #[test]
    fn test_download_name_disambiguates_duplicates() {
        let older = clip_with("same line", 100);
        let newer = clip_with("same line", 0);
        let all = vec![newer.clone(), older.clone()];

        assert_eq!(download_name(&older, &all), "same line.wav");
        assert_eq!(download_name(&newer, &all), "same line (2).wav");
    }

    #[test]
    fn test_download_name_ignores_other_transcripts() {
        let a = clip_with("alpha", 0);
        let b = clip_with("beta", 0);
        let all = vec![a.clone(), b.clone()];

        assert_eq!(download_name(&a, &all), "alpha.wav");
        assert_eq!(download_name(&b, &all), "beta.wav");
    }

    fn make_wav(samples: &[i16]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_export_clip_cuts_and_caches() {
        let tmp = TempDir::new().unwrap();
        let data = Arc::new(DataStore::open(tmp.path().join("data.json")).unwrap());
        let store = FsAudioStore::new(tmp.path().join("uploads"), Arc::clone(&data)).unwrap();
        let cache_dir = tmp.path().join("clips_cache");

        let profile_id = Uuid::new_v4();
        let audio = store
            .store(profile_id, "rec.wav", &make_wav(&vec![9i16; 16000]))
            .unwrap();

        let mut clip = clip_with("cut me", 0);
        clip.profile_id = profile_id;
        clip.audio_id = audio.id;
        clip.start_s = 0.25;
        clip.end_s = 0.5;
        data.add_clip(clip.clone()).unwrap();

        let exported = export_clip(&data, &store, &cache_dir, &clip.id).unwrap();
        assert!(exported.path.exists());
        assert_eq!(exported.filename, "cut me.wav");

        // Second export reuses the cached file
        let modified_before = std::fs::metadata(&exported.path).unwrap().modified().unwrap();
        let again = export_clip(&data, &store, &cache_dir, &clip.id).unwrap();
        assert_eq!(again.path, exported.path);
        let modified_after = std::fs::metadata(&again.path).unwrap().modified().unwrap();
        assert_eq!(modified_before, modified_after);
    }

    #[test]
    fn test_export_unknown_clip_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let data = Arc::new(DataStore::open(tmp.path().join("data.json")).unwrap());
        let store = FsAudioStore::new(tmp.path().join("uploads"), Arc::clone(&data)).unwrap();

        let result = export_clip(&data, &store, tmp.path(), &Uuid::new_v4());
        assert!(matches!(result, Err(ClipdexError::ClipNotFound { .. })));
    }

    #[test]
    fn test_export_with_missing_audio_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let data = Arc::new(DataStore::open(tmp.path().join("data.json")).unwrap());
        let store = FsAudioStore::new(tmp.path().join("uploads"), Arc::clone(&data)).unwrap();

        let clip = clip_with("orphan", 0);
        data.add_clip(clip.clone()).unwrap();

        let result = export_clip(&data, &store, tmp.path(), &clip.id);
        assert!(matches!(result, Err(ClipdexError::AudioNotFound { .. })));
    }

    #[test]
    fn test_remove_cached_cuts_only_touches_matching_prefix() {
        let tmp = TempDir::new().unwrap();
        let clip_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        let mine = tmp.path().join(format!("{clip_id}_0.000_1.000.wav"));
        let theirs = tmp.path().join(format!("{other_id}_0.000_1.000.wav"));
        std::fs::write(&mine, b"x").unwrap();
        std::fs::write(&theirs, b"x").unwrap();

        remove_cached_cuts(tmp.path(), &clip_id);

        assert!(!mine.exists());
        assert!(theirs.exists());
    }

    #[test]
    fn test_remove_cached_cuts_missing_dir_is_fine() {
        remove_cached_cuts(Path::new("/nonexistent/cache"), &Uuid::new_v4());
    }
}
