//! Speech-to-text: the transcriber contract and the Whisper implementation.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{CancelToken, MockTranscriber, Segment, Transcriber};
pub use whisper::{WhisperConfig, WhisperTranscriber};
