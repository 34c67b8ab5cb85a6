use crate::error::{ClipdexError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One timestamped transcript segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start offset in seconds from the beginning of the recording.
    pub start_s: f64,
    /// End offset in seconds.
    pub end_s: f64,
    /// Transcribed text.
    pub text: String,
}

impl Segment {
    pub fn new(start_s: f64, end_s: f64, text: impl Into<String>) -> Self {
        Self {
            start_s,
            end_s,
            text: text.into(),
        }
    }

    /// Segment duration in seconds.
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Shared cancellation flag polled by transcribers at their checkpoints.
///
/// Set at most once, never cleared. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag (the job registry owns the per-job flag).
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }

    /// Request cancellation. Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples into ordered, timestamped segments.
    ///
    /// # Arguments
    /// * `audio` - Audio samples as 16-bit PCM at 16kHz mono
    /// * `on_progress` - Called with completion in [0,1] at bounded intervals
    /// * `cancel` - Polled between internal steps; once set, implementations
    ///   must stop promptly and return `ClipdexError::TranscriptionCancelled`
    ///
    /// # Returns
    /// Transcript segments ordered by start time, or an error
    fn run(
        &self,
        audio: &[i16],
        on_progress: &mut dyn FnMut(f32),
        cancel: &CancelToken,
    ) -> Result<Vec<Segment>>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across jobs.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn run(
        &self,
        audio: &[i16],
        on_progress: &mut dyn FnMut(f32),
        cancel: &CancelToken,
    ) -> Result<Vec<Segment>> {
        (**self).run(audio, on_progress, cancel)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
///
/// Emits a scripted number of progress callbacks, polling the cancel token
/// before each one, then returns configured segments or a failure.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    segments: Vec<Segment>,
    progress_steps: usize,
    step_delay: Option<Duration>,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            segments: Vec::new(),
            progress_steps: 5,
            step_delay: None,
            should_fail: false,
        }
    }

    /// Configure the segments returned on success
    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    /// Append one segment to the mock transcript
    pub fn with_segment(mut self, start_s: f64, end_s: f64, text: &str) -> Self {
        self.segments.push(Segment::new(start_s, end_s, text));
        self
    }

    /// Configure how many progress callbacks are emitted (min 1)
    pub fn with_progress_steps(mut self, steps: usize) -> Self {
        self.progress_steps = steps.max(1);
        self
    }

    /// Sleep this long before each progress step, leaving room for a
    /// caller to request cancellation mid-transcription.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Configure the mock to fail after reporting all progress
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn run(
        &self,
        _audio: &[i16],
        on_progress: &mut dyn FnMut(f32),
        cancel: &CancelToken,
    ) -> Result<Vec<Segment>> {
        for step in 0..self.progress_steps {
            if let Some(delay) = self.step_delay {
                std::thread::sleep(delay);
            }
            if cancel.is_cancelled() {
                return Err(ClipdexError::TranscriptionCancelled);
            }
            let fraction = if self.progress_steps <= 1 {
                1.0
            } else {
                step as f32 / (self.progress_steps - 1) as f32
            };
            on_progress(fraction);
        }

        if cancel.is_cancelled() {
            return Err(ClipdexError::TranscriptionCancelled);
        }

        if self.should_fail {
            return Err(ClipdexError::TranscriptionFailed {
                message: "mock transcription failure".to_string(),
            });
        }

        Ok(self.segments.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
