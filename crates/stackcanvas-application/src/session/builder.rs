use stackcanvas_core::config::EngineConfig;
use stackcanvas_core::error::Result;
use stackcanvas_core::identity::{AnonymousIdentity, IdentityProvider};
use stackcanvas_core::save::{LocalSaveStore, RemoteSaveStore};
use stackcanvas_core::snapshot::CanvasState;
use stackcanvas_infrastructure::{FileLocalSaveStore, HttpRemoteSaveStore};
use std::sync::Arc;

use super::canvas_session::CanvasSession;
use crate::auto_save::AutoSaveService;

/// Assembles a [`CanvasSession`] from stores, identity and configuration.
///
/// Defaults:
/// - Local store: [`FileLocalSaveStore`] under the platform saves directory
/// - Remote store: [`HttpRemoteSaveStore`] when `[remote] base_url` is set
/// - Identity: [`AnonymousIdentity`] (local-only)
pub struct CanvasSessionBuilder {
    session_key: String,
    local: Option<Arc<dyn LocalSaveStore>>,
    remote: Option<Arc<dyn RemoteSaveStore>>,
    identity: Arc<dyn IdentityProvider>,
    config: EngineConfig,
    initial: CanvasState,
}

impl CanvasSessionBuilder {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            local: None,
            remote: None,
            identity: Arc::new(AnonymousIdentity),
            config: EngineConfig::default(),
            initial: CanvasState::empty(),
        }
    }

    pub fn local_store(mut self, store: Arc<dyn LocalSaveStore>) -> Self {
        self.local = Some(store);
        self
    }

    pub fn remote_store(mut self, store: Arc<dyn RemoteSaveStore>) -> Self {
        self.remote = Some(store);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_state(mut self, state: CanvasState) -> Self {
        self.initial = state;
        self
    }

    /// Builds the session.
    ///
    /// # Errors
    ///
    /// Returns an error if no local store was given and the platform saves
    /// directory cannot be resolved.
    pub fn build(self) -> Result<CanvasSession> {
        let local: Arc<dyn LocalSaveStore> = match self.local {
            Some(local) => local,
            None => Arc::new(FileLocalSaveStore::default_location()?),
        };
        let remote = self.remote.or_else(|| {
            HttpRemoteSaveStore::from_config(&self.config.remote)
                .map(|store| Arc::new(store) as Arc<dyn RemoteSaveStore>)
        });

        let auto_save = match remote {
            Some(remote) => AutoSaveService::with_remote(
                self.session_key,
                local,
                remote,
                self.identity,
                self.config.auto_save,
            ),
            None => AutoSaveService::new(self.session_key, local, self.config.auto_save),
        };

        Ok(CanvasSession::new(self.initial, auto_save, self.config.history))
    }
}
