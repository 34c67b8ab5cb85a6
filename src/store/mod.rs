//! Persistence: the JSON data file, uploaded audio, and clip writing.

pub mod audio_store;
pub mod clip_index;
pub mod data;

pub use audio_store::{AudioStore, FsAudioStore, MockAudioStore};
pub use clip_index::{ClipIndex, JsonClipIndex, MockClipIndex};
pub use data::{AudioRecord, ClipRecord, DataStore, ProfileRecord};
