//! File-backed local save store.
//!
//! Directory structure:
//! ```text
//! saves_dir/
//! ├── builder-main.json
//! └── project_42.json
//! ```

use crate::paths::CanvasPaths;
use crate::storage::AtomicJsonFile;
use stackcanvas_core::error::{CanvasError, Result};
use stackcanvas_core::save::{LocalSaveStore, SaveRecord};
use std::path::{Path, PathBuf};

/// Stores one JSON document per session key.
///
/// File names are the percent-encoded key, e.g. `project:1` is stored as
/// `project%3A1.json`.
///
/// Writes go through [`AtomicJsonFile`], so a crash mid-save leaves the
/// previous record intact.
#[derive(Debug, Clone)]
pub struct FileLocalSaveStore {
    saves_dir: PathBuf,
}

impl FileLocalSaveStore {
    /// Creates a store at the default location (`~/.config/stackcanvas/saves`).
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(CanvasPaths::saves_dir()?))
    }

    /// Creates a store rooted at `saves_dir`. The directory is created lazily.
    pub fn new(saves_dir: impl AsRef<Path>) -> Self {
        Self {
            saves_dir: saves_dir.as_ref().to_path_buf(),
        }
    }

    pub fn saves_dir(&self) -> &Path {
        &self.saves_dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.saves_dir.join(format!("{}.json", encode_key(key)?)))
    }

    fn file(&self, key: &str) -> Result<AtomicJsonFile<SaveRecord>> {
        Ok(AtomicJsonFile::new(self.path_for(key)?))
    }
}

impl LocalSaveStore for FileLocalSaveStore {
    fn get(&self, key: &str) -> Result<Option<SaveRecord>> {
        self.file(key)?.load()
    }

    fn set(&self, key: &str, record: &SaveRecord) -> Result<()> {
        self.file(key)?.replace(record)?;
        tracing::debug!("Local save written for session '{}'", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.file(key)?.remove()
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.file(key)?.exists())
    }
}

/// Maps a session key onto a file-safe name.
///
/// `[A-Za-z0-9_-]` is kept as is and every other byte becomes `%XX`. Since
/// `%` itself is escaped, distinct keys never share a file, and keys like
/// `../x` cannot escape the saves directory.
fn encode_key(key: &str) -> Result<String> {
    if key.trim().is_empty() {
        return Err(CanvasError::data_access("Session key must not be empty"));
    }
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    Ok(encoded)
}
