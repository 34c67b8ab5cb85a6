//! Audio decoding and clip extraction.

pub mod wav;

pub use wav::{DecodedAudio, decode_wav, decode_wav_bytes, decode_wav_file, extract_clip_wav};
