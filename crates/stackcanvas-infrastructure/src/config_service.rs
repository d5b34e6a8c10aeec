//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the engine configuration
//! from the configuration file (~/.config/stackcanvas/config.toml).

use crate::paths::CanvasPaths;
use stackcanvas_core::config::EngineConfig;
use stackcanvas_core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the engine configuration.
///
/// This implementation reads the configuration from config.toml
/// and caches it to avoid repeated file I/O operations.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit config file; `None` resolves the platform default on load.
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<EngineConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading the platform config file.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a ConfigService reading `path` instead of the platform default.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Path of the file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(CanvasPaths::config_file()?),
        }
    }

    /// Gets the engine configuration, loading from file if not cached.
    ///
    /// A missing file yields defaults; a malformed file is an error and is
    /// not cached.
    pub fn get_config(&self) -> Result<EngineConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        {
            let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    fn load_config(&self) -> Result<EngineConfig> {
        let config_path = self.config_path()?;

        if !config_path.exists() {
            tracing::debug!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            return Ok(EngineConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        assert_eq!(service.get_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_file_is_merged_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[history]\nmax_size = 10\n\n[remote]\nbase_url = \"http://localhost:8080\"\n",
        )
        .unwrap();

        let config = ConfigService::with_path(&path).get_config().unwrap();
        assert_eq!(config.history.max_size, 10);
        assert_eq!(config.auto_save.debounce_ms, 1500);
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_malformed_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[history\nmax_size = ").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_cache_and_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[history]\nmax_size = 5\n").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().unwrap().history.max_size, 5);

        fs::write(&path, "[history]\nmax_size = 7\n").unwrap();
        // Still cached
        assert_eq!(service.get_config().unwrap().history.max_size, 5);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().history.max_size, 7);
    }
}
