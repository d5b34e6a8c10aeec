//! Unified path management for StackCanvas files.
//!
//! All paths are resolved from the platform config directory via the `dirs`
//! crate, so they are consistent across Linux, macOS and Windows.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for stackcanvas_core::CanvasError {
    fn from(err: PathError) -> Self {
        stackcanvas_core::CanvasError::config(err.to_string())
    }
}

/// Unified path management for StackCanvas.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/stackcanvas/       # Config directory
/// ├── config.toml              # Engine configuration
/// └── saves/                   # Local canvas saves (FileLocalSaveStore)
///     └── <session-key>.json
/// ```
pub struct CanvasPaths;

impl CanvasPaths {
    const APP_DIR: &'static str = "stackcanvas";

    /// Returns the StackCanvas configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/stackcanvas/`)
    /// - `Err(PathError::ConfigDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding local canvas saves.
    pub fn saves_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("saves"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let config_dir = CanvasPaths::config_dir().unwrap();
        assert!(config_dir.ends_with("stackcanvas"));
    }

    #[test]
    fn test_config_file() {
        let config_file = CanvasPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        // Verify it's under config_dir
        let config_dir = CanvasPaths::config_dir().unwrap();
        assert!(config_file.starts_with(&config_dir));
    }

    #[test]
    fn test_saves_dir() {
        let saves_dir = CanvasPaths::saves_dir().unwrap();
        assert!(saves_dir.ends_with("saves"));
        let config_dir = CanvasPaths::config_dir().unwrap();
        assert!(saves_dir.starts_with(&config_dir));
    }
}
