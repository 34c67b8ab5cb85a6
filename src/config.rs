use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub stt: SttConfig,
    pub search: SearchConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix socket path. None = $XDG_RUNTIME_DIR/clipdex.sock fallback.
    pub socket: Option<PathBuf>,
}

/// Storage layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory holding data.json, uploads/ and clips_cache/.
    /// None = XDG data dir (~/.local/share/clipdex).
    pub data_dir: Option<PathBuf>,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to a ggml Whisper model file. Required for transcription.
    pub model_path: Option<PathBuf>,
    pub language: String,
    /// Number of inference threads (None = auto-detect)
    pub threads: Option<usize>,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: defaults::DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CLIPDEX_MODEL_PATH → stt.model_path
    /// - CLIPDEX_LANGUAGE → stt.language
    /// - CLIPDEX_DATA_DIR → storage.data_dir
    /// - CLIPDEX_SOCKET → server.socket
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model_path) = std::env::var("CLIPDEX_MODEL_PATH")
            && !model_path.is_empty()
        {
            self.stt.model_path = Some(PathBuf::from(model_path));
        }

        if let Ok(language) = std::env::var("CLIPDEX_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(data_dir) = std::env::var("CLIPDEX_DATA_DIR")
            && !data_dir.is_empty()
        {
            self.storage.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Ok(socket) = std::env::var("CLIPDEX_SOCKET")
            && !socket.is_empty()
        {
            self.server.socket = Some(PathBuf::from(socket));
        }

        self
    }

    /// Resolve the data directory, falling back to the XDG data dir.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("clipdex")
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/clipdex/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipdex")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_clipdex_env() {
        remove_env("CLIPDEX_MODEL_PATH");
        remove_env("CLIPDEX_LANGUAGE");
        remove_env("CLIPDEX_DATA_DIR");
        remove_env("CLIPDEX_SOCKET");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.server.socket, None);
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(config.stt.model_path, None);
        assert_eq!(config.stt.language, "auto");
        assert_eq!(config.stt.threads, None);
        assert_eq!(config.search.default_limit, 50);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [server]
            socket = "/run/user/1000/clipdex.sock"

            [storage]
            data_dir = "/var/lib/clipdex"

            [stt]
            model_path = "/models/ggml-base.bin"
            language = "ko"
            threads = 4

            [search]
            default_limit = 25
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(
            config.server.socket,
            Some(PathBuf::from("/run/user/1000/clipdex.sock"))
        );
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/var/lib/clipdex"))
        );
        assert_eq!(
            config.stt.model_path,
            Some(PathBuf::from("/models/ggml-base.bin"))
        );
        assert_eq!(config.stt.language, "ko");
        assert_eq!(config.stt.threads, Some(4));
        assert_eq!(config.search.default_limit, 25);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [stt]
            language = "en"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        // Only language should be overridden
        assert_eq!(config.stt.language, "en");

        // Everything else should be defaults
        assert_eq!(config.server.socket, None);
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(config.stt.model_path, None);
        assert_eq!(config.search.default_limit, 50);
    }

    #[test]
    fn test_env_override_language() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_clipdex_env();

        set_env("CLIPDEX_LANGUAGE", "ja");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.stt.language, "ja");
        assert_eq!(config.stt.model_path, None); // Not overridden

        clear_clipdex_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_clipdex_env();

        set_env("CLIPDEX_MODEL_PATH", "/m/ggml-small.bin");
        set_env("CLIPDEX_LANGUAGE", "ko");
        set_env("CLIPDEX_DATA_DIR", "/data/clipdex");
        set_env("CLIPDEX_SOCKET", "/tmp/clipdex-test.sock");

        let config = Config::default().with_env_overrides();

        assert_eq!(
            config.stt.model_path,
            Some(PathBuf::from("/m/ggml-small.bin"))
        );
        assert_eq!(config.stt.language, "ko");
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/data/clipdex"))
        );
        assert_eq!(
            config.server.socket,
            Some(PathBuf::from("/tmp/clipdex-test.sock"))
        );

        clear_clipdex_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_clipdex_env();

        set_env("CLIPDEX_LANGUAGE", "");
        let config = Config::default().with_env_overrides();

        // Empty string should not override default
        assert_eq!(config.stt.language, "auto");

        clear_clipdex_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [server
            socket = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());

        assert!(result.is_err());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("clipdex"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_data_dir_explicit_wins() {
        let config = Config {
            storage: StorageConfig {
                data_dir: Some(PathBuf::from("/custom/data")),
            },
            ..Default::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/custom/data"));
    }

    #[test]
    fn test_data_dir_fallback_mentions_crate() {
        let config = Config::default();
        let dir = config.data_dir();
        assert!(dir.to_string_lossy().contains("clipdex"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_clipdex_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let invalid_toml = r#"
            [server
            socket = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        // Invalid TOML must not silently fall back to defaults
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }
}
