//! Default configuration constants for clipdex.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

/// Audio sample rate in Hz that transcription expects.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default language code for transcription.
///
/// "auto" lets Whisper detect the spoken language automatically.
/// Set to a specific code (e.g., "en", "ko") to force a language.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Job progress value published when transcription begins.
///
/// The 0–20 band belongs to client-side upload reporting; the daemon's own
/// progress starts here and maps transcriber completion onto 20–100.
pub const TRANSCRIBE_PROGRESS_BASE: u8 = 20;

/// Minimum duration in seconds for a transcript segment to become a clip.
///
/// Whisper occasionally emits sub-150ms fragments (breaths, clicks); they
/// carry no searchable content and are dropped before persistence.
pub const MIN_SEGMENT_SECS: f64 = 0.15;

/// Maximum length in characters for a clip download filename.
pub const MAX_DOWNLOAD_NAME_LEN: usize = 80;

/// Default number of search results returned when no limit is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Name of the JSON data file inside the data directory.
pub const DATA_FILE: &str = "data.json";

/// Name of the directory holding raw uploaded audio files.
pub const UPLOADS_DIR: &str = "uploads";

/// Name of the directory holding extracted per-clip WAV files.
pub const CLIP_CACHE_DIR: &str = "clips_cache";
