use anyhow::{Context, Result};
use stackcanvas_application::CanvasSession;
use stackcanvas_core::config::EngineConfig;
use stackcanvas_core::identity::StaticIdentity;
use stackcanvas_core::save::{LocalSaveStore, SaveRecord};
use stackcanvas_infrastructure::{CanvasPaths, ConfigService, FileLocalSaveStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolved configuration and storage shared by every command.
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: EngineConfig,
    pub store: FileLocalSaveStore,
}

impl CliContext {
    /// Loads configuration and opens the local saves directory.
    ///
    /// Explicit paths take precedence over the platform defaults.
    pub fn load(config_path: Option<PathBuf>, saves_dir: Option<PathBuf>) -> Result<Self> {
        let config_service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new(),
        };
        let config_path = config_service.config_path()?;
        let config = config_service
            .get_config()
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let saves_dir = match saves_dir {
            Some(dir) => dir,
            None => CanvasPaths::saves_dir()?,
        };
        tracing::debug!("Using saves directory {}", saves_dir.display());

        Ok(Self {
            config_path,
            config,
            store: FileLocalSaveStore::new(saves_dir),
        })
    }

    /// The local record for `session`, or an error naming the session.
    pub fn require_record(&self, session: &str) -> Result<SaveRecord> {
        self.store
            .get(session)
            .with_context(|| format!("Failed to read save for session '{}'", session))?
            .with_context(|| format!("No local save for session '{}'", session))
    }

    /// Builds a canvas session over the local store, signed in as `owner`.
    pub fn canvas_session(&self, session: &str, owner: Option<String>) -> Result<CanvasSession> {
        let session = CanvasSession::builder(session)
            .local_store(Arc::new(self.store.clone()))
            .identity(Arc::new(StaticIdentity::from_option(owner)))
            .config(self.config.clone())
            .build()?;
        Ok(session)
    }
}
