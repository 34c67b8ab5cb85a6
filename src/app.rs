//! Daemon composition root.
//!
//! Builds the storage layout, wires the stores and the orchestrator into
//! shared state, and runs the API server until shutdown.

use crate::api::handler::ApiHandler;
use crate::api::server::ApiServer;
use crate::config::Config;
use crate::defaults;
use crate::error::{ClipdexError, Result};
use crate::job::orchestrator::JobOrchestrator;
use crate::job::registry::JobRegistry;
use crate::store::audio_store::{AudioStore, FsAudioStore};
use crate::store::clip_index::JsonClipIndex;
use crate::store::data::DataStore;
use crate::stt::transcriber::Transcriber;
use crate::stt::whisper::{WhisperConfig, WhisperTranscriber};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the request handler needs, shared across connections.
pub struct AppState {
    pub config: Config,
    pub data: Arc<DataStore>,
    pub audio: Arc<dyn AudioStore>,
    pub orchestrator: JobOrchestrator,
    pub transcriber: Arc<dyn Transcriber>,
    pub cache_dir: PathBuf,
}

impl AppState {
    /// Create the storage layout under the configured data directory and
    /// wire up stores, registry, and orchestrator.
    pub fn build(config: Config, transcriber: Arc<dyn Transcriber>) -> Result<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let uploads_dir = data_dir.join(defaults::UPLOADS_DIR);
        let cache_dir = data_dir.join(defaults::CLIP_CACHE_DIR);
        std::fs::create_dir_all(&cache_dir)?;

        let data = Arc::new(DataStore::open(data_dir.join(defaults::DATA_FILE))?);
        let audio: Arc<dyn AudioStore> =
            Arc::new(FsAudioStore::new(uploads_dir, Arc::clone(&data))?);
        let clips = Arc::new(JsonClipIndex::new(Arc::clone(&data)));

        let orchestrator = JobOrchestrator::new(
            Arc::new(JobRegistry::new()),
            Arc::clone(&audio),
            Arc::clone(&transcriber),
            clips,
        );

        Ok(Self {
            config,
            data,
            audio,
            orchestrator,
            transcriber,
            cache_dir,
        })
    }
}

/// Load the Whisper model configured for the daemon.
///
/// Loading happens once at startup; the model stays in memory and is shared
/// by every job.
pub fn build_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let model_path =
        config
            .stt
            .model_path
            .clone()
            .ok_or_else(|| ClipdexError::ConfigInvalidValue {
                key: "stt.model_path".to_string(),
                message: "a Whisper model path is required to run the daemon".to_string(),
            })?;

    let transcriber = WhisperTranscriber::new(WhisperConfig {
        model_path,
        language: config.stt.language.clone(),
        threads: config.stt.threads,
    })?;
    Ok(Arc::new(transcriber))
}

/// Run the daemon: load the model, bind the socket, serve until shutdown.
pub async fn run_serve(config: Config, socket_override: Option<PathBuf>) -> Result<()> {
    let socket_path = socket_override
        .or_else(|| config.server.socket.clone())
        .unwrap_or_else(ApiServer::default_socket_path);

    log::info!("loading model...");
    let transcriber = build_transcriber(&config)?;
    log::info!("model '{}' loaded", transcriber.model_name());

    let state = Arc::new(AppState::build(config, transcriber)?);
    log::info!("data directory: {}", state.config.data_dir().display());

    let server = ApiServer::new(socket_path)?;
    let handler = ApiHandler::new(state);
    server.start(handler).await?;
    server.stop().await?;
    log::info!("daemon stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::stt::transcriber::MockTranscriber;
    use tempfile::TempDir;

    #[test]
    fn test_build_transcriber_requires_model_path() {
        let config = Config::default();
        let result = build_transcriber(&config);
        assert!(matches!(
            result,
            Err(ClipdexError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_build_transcriber_missing_model_file() {
        let mut config = Config::default();
        config.stt.model_path = Some(PathBuf::from("/nonexistent/ggml-base.bin"));
        let result = build_transcriber(&config);
        assert!(matches!(
            result,
            Err(ClipdexError::TranscriptionModelNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_app_state_build_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            storage: StorageConfig {
                data_dir: Some(tmp.path().join("data")),
            },
            ..Default::default()
        };

        let state = AppState::build(config, Arc::new(MockTranscriber::new("mock"))).unwrap();

        assert!(tmp.path().join("data").exists());
        assert!(tmp.path().join("data/clips_cache").exists());
        assert!(state.data.profiles().is_empty());
        assert_eq!(state.transcriber.model_name(), "mock");
    }
}
