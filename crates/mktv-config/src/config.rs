use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const TMDB_API_KEY_ENV: &str = "MKTV_TMDB_API_KEY";
pub const BACKEND_API_KEY_ENV: &str = "MKTV_BACKEND_API_KEY";
pub const BACKEND_PROJECT_ENV: &str = "MKTV_BACKEND_PROJECT_ID";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("TMDB api_key is not configured (set [tmdb].api_key or {})", TMDB_API_KEY_ENV)]
    MissingTmdbKey,
    #[error("storage backend 'remote' requires a [backend] section with project_id and api_key")]
    MissingBackend,
    #[error("invalid [progress] setting: {0}")]
    InvalidProgress(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Movie metadata API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
}

/// Hosted authentication + document database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub project_id: String,
    pub api_key: String,
    /// Override for the identity provider endpoint (e.g. a local emulator)
    #[serde(default)]
    pub auth_base_url: Option<String>,
    /// Override for the document database endpoint (e.g. a local emulator)
    #[serde(default)]
    pub database_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Position changes smaller than this are not persisted
    #[serde(default = "default_min_delta_seconds")]
    pub min_delta_seconds: f64,
    /// Quiet period before a debounced auto-save fires
    #[serde(default = "default_autosave_interval_ms")]
    pub autosave_interval_ms: u64,
    /// Titles at or above this percentage count as watched
    #[serde(default = "default_completed_threshold_percent")]
    pub completed_threshold_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON documents under the data directory
    #[default]
    File,
    /// Process-local, discarded on exit
    Memory,
    /// Hosted document database
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    pub file: Option<PathBuf>,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_min_delta_seconds() -> f64 {
    1.0
}

fn default_autosave_interval_ms() -> u64 {
    10_000
}

fn default_completed_threshold_percent() -> f64 {
    95.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_language(),
            base_url: default_tmdb_base_url(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_delta_seconds: default_min_delta_seconds(),
            autosave_interval_ms: default_autosave_interval_ms(),
            completed_threshold_percent: default_completed_threshold_percent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb: TmdbConfig::default(),
            backend: None,
            progress: ProgressConfig::default(),
            storage: StorageConfig::default(),
            logging: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise start from defaults
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply secrets from the environment on top of the file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(TMDB_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.tmdb.api_key = key;
        }

        let api_key = lookup(BACKEND_API_KEY_ENV).filter(|v| !v.is_empty());
        let project_id = lookup(BACKEND_PROJECT_ENV).filter(|v| !v.is_empty());
        if let Some(backend) = self.backend.as_mut() {
            if let Some(api_key) = api_key {
                backend.api_key = api_key;
            }
            if let Some(project_id) = project_id {
                backend.project_id = project_id;
            }
        } else if let (Some(api_key), Some(project_id)) = (api_key, project_id) {
            self.backend = Some(BackendConfig {
                project_id,
                api_key,
                auth_base_url: None,
                database_base_url: None,
            });
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let progress = &self.progress;
        if !progress.min_delta_seconds.is_finite() || progress.min_delta_seconds < 0.0 {
            return Err(ConfigError::InvalidProgress(
                "min_delta_seconds must be a non-negative number".to_string(),
            ));
        }
        if progress.autosave_interval_ms == 0 {
            return Err(ConfigError::InvalidProgress(
                "autosave_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&progress.completed_threshold_percent) {
            return Err(ConfigError::InvalidProgress(
                "completed_threshold_percent must be between 0 and 100".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Remote && !self.is_backend_configured() {
            return Err(ConfigError::MissingBackend);
        }

        Ok(())
    }

    /// Catalog commands need a TMDB key; everything else works without one
    pub fn require_tmdb(&self) -> Result<&TmdbConfig, ConfigError> {
        if self.tmdb.api_key.is_empty() || self.tmdb.api_key == "YOUR_TMDB_API_KEY" {
            return Err(ConfigError::MissingTmdbKey);
        }
        Ok(&self.tmdb)
    }

    pub fn is_backend_configured(&self) -> bool {
        match &self.backend {
            Some(backend) => !backend.project_id.is_empty() && !backend.api_key.is_empty(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tmdb.api_key = "tmdb_key".to_string();
        config.backend = Some(BackendConfig {
            project_id: "mktv-test".to_string(),
            api_key: "backend_key".to_string(),
            auth_base_url: None,
            database_base_url: Some("http://localhost:8080".to_string()),
        });
        config.progress.autosave_interval_ms = 5000;

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.tmdb.api_key, "tmdb_key");
        assert_eq!(loaded.progress.autosave_interval_ms, 5000);
        assert_eq!(loaded.progress.min_delta_seconds, 1.0);
        let backend = loaded.backend.unwrap();
        assert_eq!(backend.project_id, "mktv-test");
        assert_eq!(backend.database_base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config: Config = toml::from_str("[tmdb]\napi_key = \"abc\"\n").unwrap();
        assert_eq!(config.tmdb.api_key, "abc");
        assert_eq!(config.tmdb.language, "en-US");
        assert_eq!(config.progress.min_delta_seconds, 1.0);
        assert_eq!(config.progress.autosave_interval_ms, 10_000);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert!(config.backend.is_none());
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.storage.backend = StorageBackend::Remote;
        assert_eq!(config.validate(), Err(ConfigError::MissingBackend));

        config.backend = Some(BackendConfig {
            project_id: "p".to_string(),
            api_key: "k".to_string(),
            auth_base_url: None,
            database_base_url: None,
        });
        assert!(config.validate().is_ok());

        config.progress.autosave_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidProgress(_))));
    }

    #[test]
    fn test_require_tmdb() {
        let mut config = Config::default();
        assert_eq!(config.require_tmdb().unwrap_err(), ConfigError::MissingTmdbKey);
        config.tmdb.api_key = "YOUR_TMDB_API_KEY".to_string();
        assert!(config.require_tmdb().is_err());
        config.tmdb.api_key = "real".to_string();
        assert!(config.require_tmdb().is_ok());
    }

    #[test]
    fn test_env_overrides_create_backend() {
        let env: HashMap<&str, &str> = [
            (TMDB_API_KEY_ENV, "from_env"),
            (BACKEND_API_KEY_ENV, "bk"),
            (BACKEND_PROJECT_ENV, "proj"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.tmdb.api_key, "from_env");
        assert!(config.is_backend_configured());
        assert_eq!(config.backend.unwrap().project_id, "proj");
    }

    #[test]
    fn test_env_overrides_ignore_empty_values() {
        let mut config = Config::default();
        config.tmdb.api_key = "file_key".to_string();
        config.apply_overrides(|key| (key == TMDB_API_KEY_ENV).then(String::new));
        assert_eq!(config.tmdb.api_key, "file_key");
    }
}
