use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("MKTV_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

#[derive(Debug, Clone)]
pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("mktv");

        Ok(Self::rooted_at(base_dir))
    }

    pub fn from_docker_env() -> Self {
        Self::rooted_at(container_base_path())
    }

    /// Config files at `base`, data and logs in subdirectories
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            config_dir: base.clone(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Directory holding one JSON file per document collection
    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("mktv.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(self.records_dir())?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container image creates the base directory, so its presence indicates Docker
        let base = container_base_path();
        if base.exists() {
            return Self::from_docker_env();
        }

        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rooted_layout() {
        let paths = PathManager::rooted_at("/srv/mktv");
        assert_eq!(paths.config_file(), PathBuf::from("/srv/mktv/config.toml"));
        assert_eq!(paths.credentials_file(), PathBuf::from("/srv/mktv/credentials.toml"));
        assert_eq!(paths.records_dir(), PathBuf::from("/srv/mktv/data/records"));
        assert_eq!(paths.log_file(), PathBuf::from("/srv/mktv/logs/mktv.log"));
    }

    #[test]
    fn test_ensure_directories() {
        let dir = TempDir::new().unwrap();
        let paths = PathManager::rooted_at(dir.path().join("mktv"));
        paths.ensure_directories().unwrap();
        assert!(paths.records_dir().is_dir());
        assert!(paths.log_dir().is_dir());
    }
}
