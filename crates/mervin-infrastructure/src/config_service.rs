//! Configuration service.
//!
//! Loads [`SessionConfig`] from `config.toml` and caches it.

use crate::paths::MervinPaths;
use crate::storage::AtomicTomlFile;
use mervin_core::{MervinError, Result, SessionConfig};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<SessionConfig>>>,
}

impl ConfigService {
    /// Service reading `path`. Nothing is read until first access.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading the default `~/.config/mervin/config.toml`.
    pub fn default_location() -> Result<Self> {
        let path = MervinPaths::config_file().map_err(|e| MervinError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// A missing file yields defaults. A malformed file is an error and is
    /// not cached, so fixing the file takes effect on the next call.
    pub fn get_config(&self) -> Result<SessionConfig> {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = match AtomicTomlFile::<SessionConfig>::new(self.path.clone()).load()? {
            Some(config) => config,
            None => {
                tracing::info!(
                    "No config at {}, using defaults",
                    self.path.display()
                );
                SessionConfig::default()
            }
        };

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes `config` and refreshes the cache.
    pub fn save_config(&self, config: &SessionConfig) -> Result<()> {
        AtomicTomlFile::<SessionConfig>::new(self.path.clone()).save(config)?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mervin_core::ChatMode;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_reads_file_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_mode = \"agent\"\nlanguage = \"en\"\n").unwrap();

        let service = ConfigService::with_path(path.clone());
        let config = service.get_config().unwrap();
        assert_eq!(config.default_mode, ChatMode::Agent);
        assert_eq!(config.language, "en");

        std::fs::write(&path, "language = \"es\"\n").unwrap();
        assert_eq!(service.get_config().unwrap().language, "en");

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().language, "es");
    }

    #[test]
    fn test_save_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::with_path(path.clone());

        let config = SessionConfig {
            user_id: "crew-7".to_string(),
            ..SessionConfig::default()
        };
        service.save_config(&config).unwrap();

        let fresh = ConfigService::with_path(path);
        assert_eq!(fresh.get_config().unwrap().user_id, "crew-7");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "stream_idle_timeout_ms = \"soon\"").unwrap();

        let service = ConfigService::with_path(path);
        assert!(service.get_config().is_err());
    }
}
