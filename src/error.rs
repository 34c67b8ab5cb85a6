//! Error types for clipdex.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipdexError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Lookup errors, surfaced directly to API callers
    #[error("No job with id {id}")]
    JobNotFound { id: String },

    #[error("No profile with id {id}")]
    ProfileNotFound { id: String },

    #[error("No clip with id {id}")]
    ClipNotFound { id: String },

    #[error("No stored audio with id {id}")]
    AudioNotFound { id: String },

    // Upload / decode errors
    #[error("Unsupported audio format: {extension}")]
    UnsupportedAudioFormat { extension: String },

    #[error("Failed to decode audio: {message}")]
    AudioDecode { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription failed: {message}")]
    TranscriptionFailed { message: String },

    /// Cooperative cancellation observed at a checkpoint. Not a failure:
    /// the job pipeline maps this to the `cancelled` terminal state.
    #[error("Transcription cancelled")]
    TranscriptionCancelled,

    // Clip persistence: clips written before the failure stay durable
    #[error("Persisted {persisted} of {total} clips before failure: {message}")]
    ClipPersist {
        persisted: usize,
        total: usize,
        message: String,
    },

    #[error("Data store error: {message}")]
    DataStore { message: String },

    // API errors
    #[error("API socket error: {message}")]
    ApiSocket { message: String },

    #[error("API protocol error: {message}")]
    ApiProtocol { message: String },

    #[error("API connection failed: {message}")]
    ApiConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ClipdexError>;
