//! Clip search: normalization modes and trigram scoring.
//!
//! Each clip stores three precomputed keys (jamo-flattened, Korean
//! pronunciation, Japanese kana); a query is normalized the same way and
//! matched by substring or character-trigram overlap.

pub mod japanese;
pub mod korean;

use crate::store::data::ClipRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// How a query is normalized and which clip key it matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Jamo-flattened literal matching.
    #[default]
    Basic,
    /// Korean pronunciation matching (liaison, assimilation).
    KoSound,
    /// Japanese kana matching (katakana folded, romaji and Hangul queries
    /// converted to hiragana).
    JpSound,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::KoSound => "ko_sound",
            Self::JpSound => "jp_sound",
        }
    }
}

impl FromStr for SearchMode {
    type Err = std::convert::Infallible;

    /// Unknown modes fall back to basic rather than erroring, matching the
    /// forgiving behavior of the search endpoint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ko_sound" | "ko-sound" => Self::KoSound,
            "jp_sound" | "jp-sound" => Self::JpSound,
            _ => Self::Basic,
        })
    }
}

/// Trim and remove all whitespace, keep everything else.
pub fn sanitize_keep_unicode(s: &str) -> String {
    s.trim().chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Basic normalization: strip punctuation, lowercase, flatten Hangul to jamo.
pub fn norm_basic(s: &str) -> String {
    korean::hangul_to_jamo(&korean::sanitize_for_match(s))
}

/// Normalize a query for the given mode.
///
/// For `jp_sound` the query's script decides the conversion: kana is folded
/// directly, Latin is read as romaji, Hangul goes through a phonetic guess.
pub fn normalize_query(query: &str, mode: SearchMode) -> String {
    match mode {
        SearchMode::Basic => norm_basic(query),
        SearchMode::KoSound => korean::norm_ko_sound(query),
        SearchMode::JpSound => {
            let raw = sanitize_keep_unicode(query);
            let has_kana = raw
                .chars()
                .any(|ch| japanese::is_hiragana(ch) || japanese::is_katakana(ch));
            let has_latin = raw.chars().any(|ch| ch.is_ascii_alphabetic());
            let has_hangul = raw.chars().any(korean::is_hangul_syllable);

            if has_kana {
                japanese::jp_kana_norm(&raw)
            } else if has_latin {
                japanese::romaji_to_hiragana(&raw)
            } else if has_hangul {
                korean::hangul_to_hiragana_guess(&raw)
            } else {
                String::new()
            }
        }
    }
}

/// Score a normalized needle against a normalized haystack.
///
/// Exact substring scores 100; otherwise the Jaccard similarity of the two
/// character-trigram sets, scaled to 0–100. Strings shorter than a trigram
/// cannot fuzzy-match.
pub fn score_contains(needle: &str, hay: &str) -> i32 {
    if needle.is_empty() {
        return 0;
    }
    if hay.contains(needle) {
        return 100;
    }

    const N: usize = 3;
    let needle_chars: Vec<char> = needle.chars().collect();
    let hay_chars: Vec<char> = hay.chars().collect();
    if needle_chars.len() < N || hay_chars.len() < N {
        return 0;
    }

    let trigrams = |chars: &[char]| -> HashSet<String> {
        chars.windows(N).map(|w| w.iter().collect()).collect()
    };
    let a = trigrams(&hay_chars);
    let b = trigrams(&needle_chars);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let inter = a.intersection(&b).count();
    let union = a.union(&b).count();
    (100.0 * inter as f64 / union as f64) as i32
}

/// The clip key a mode matches against, or None if the clip is not
/// searchable in that mode.
fn clip_key<'a>(clip: &'a ClipRecord, mode: SearchMode) -> Option<&'a str> {
    match mode {
        SearchMode::Basic => Some(&clip.norm),
        SearchMode::KoSound => {
            // Pronunciation search only applies to Hangul transcripts.
            if clip.transcript.chars().any(korean::is_hangul_syllable) {
                Some(&clip.ko_pron_norm)
            } else {
                None
            }
        }
        SearchMode::JpSound => {
            if clip.jp_kana_norm.is_empty() {
                None
            } else {
                Some(&clip.jp_kana_norm)
            }
        }
    }
}

/// Search clips for a query, returning up to `limit` results, best first.
///
/// An empty (or unnormalizable) query returns the most recent clips.
/// Ties in score break toward newer clips.
pub fn search(clips: Vec<ClipRecord>, query: &str, mode: SearchMode, limit: usize) -> Vec<ClipRecord> {
    let needle = normalize_query(query, mode);

    if needle.is_empty() {
        let mut recent = clips;
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        return recent;
    }

    let mut scored: Vec<(i32, ClipRecord)> = clips
        .into_iter()
        .filter_map(|clip| {
            let key = clip_key(&clip, mode)?;
            let score = score_contains(&needle, key);
            (score > 0).then_some((score, clip))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.created_at.cmp(&a.1.created_at))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(_, clip)| clip).collect()
}
