//! WAV decode for transcription input and clip extraction for export.
//!
//! Uploads are decoded to 16kHz mono 16-bit PCM (arbitrary source rates and
//! channel counts, linear-interpolation resampling). Clip extraction cuts a
//! time range out of a stored WAV at its native rate.

use crate::defaults::SAMPLE_RATE;
use crate::error::{ClipdexError, Result};
use std::io::{Cursor, Read};
use std::path::Path;

/// Decoded audio ready for the transcriber.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// 16kHz mono samples.
    pub samples: Vec<i16>,
    /// Duration of the source recording in seconds (pre-resample).
    pub duration_s: f64,
}

/// Decode WAV data from any reader into 16kHz mono samples.
pub fn decode_wav(reader: Box<dyn Read + Send>) -> Result<DecodedAudio> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| ClipdexError::AudioDecode {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(ClipdexError::AudioDecode {
            message: format!(
                "Only 16-bit integer PCM is supported, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            ),
        });
    }
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;
    if source_channels == 0 || source_rate == 0 {
        return Err(ClipdexError::AudioDecode {
            message: "WAV header reports zero channels or zero sample rate".to_string(),
        });
    }

    // Read all samples from the WAV file
    let raw_samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ClipdexError::AudioDecode {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let frames = raw_samples.len() / source_channels as usize;
    let duration_s = frames as f64 / source_rate as f64;

    // Convert to mono if stereo
    let mono_samples = if source_channels == 2 {
        raw_samples
            .chunks_exact(2)
            .map(|chunk| {
                let left = chunk[0] as i32;
                let right = chunk[1] as i32;
                ((left + right) / 2) as i16
            })
            .collect()
    } else if source_channels == 1 {
        raw_samples
    } else {
        // Average all channels for exotic layouts
        raw_samples
            .chunks_exact(source_channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / source_channels as i32) as i16
            })
            .collect()
    };

    // Resample to 16kHz if needed
    let samples = if source_rate != SAMPLE_RATE {
        resample(&mono_samples, source_rate, SAMPLE_RATE)
    } else {
        mono_samples
    };

    Ok(DecodedAudio {
        samples,
        duration_s,
    })
}

/// Decode a WAV byte buffer (upload payloads).
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<DecodedAudio> {
    decode_wav(Box::new(Cursor::new(bytes.to_vec())))
}

/// Decode a WAV file on disk.
pub fn decode_wav_file(path: &Path) -> Result<DecodedAudio> {
    let bytes = std::fs::read(path)?;
    decode_wav(Box::new(Cursor::new(bytes)))
}

/// Cut `[start_s, end_s)` out of a stored WAV into a new file at the
/// source's native spec.
///
/// Bounds are clamped: start at 0, end at least 10ms past start, both inside
/// the recording. The destination's parent directories are created.
pub fn extract_clip_wav(src: &Path, start_s: f64, end_s: f64, dst: &Path) -> Result<()> {
    let start_s = start_s.max(0.0);
    let end_s = end_s.max(start_s + 0.01);

    let bytes = std::fs::read(src)?;
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| ClipdexError::AudioDecode {
            message: format!("Failed to parse WAV file: {}", e),
        })?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(ClipdexError::AudioDecode {
            message: format!(
                "Only 16-bit integer PCM is supported, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            ),
        });
    }

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ClipdexError::AudioDecode {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let channels = spec.channels.max(1) as usize;
    let total_frames = samples.len() / channels;
    let start_frame = ((start_s * spec.sample_rate as f64) as usize).min(total_frames);
    let end_frame = ((end_s * spec.sample_rate as f64).ceil() as usize).min(total_frames);

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = hound::WavWriter::create(dst, spec).map_err(|e| ClipdexError::Io(
        std::io::Error::other(format!("Failed to create clip WAV: {}", e)),
    ))?;
    for sample in &samples[start_frame * channels..end_frame * channels] {
        writer
            .write_sample(*sample)
            .map_err(|e| ClipdexError::Io(std::io::Error::other(format!(
                "Failed to write clip sample: {}",
                e
            ))))?;
    }
    writer.finalize().map_err(|e| {
        ClipdexError::Io(std::io::Error::other(format!(
            "Failed to finalize clip WAV: {}",
            e
        )))
    })?;

    Ok(())
}

/// Simple linear interpolation resampling.
pub(crate) fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
