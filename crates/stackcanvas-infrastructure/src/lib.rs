pub mod config_service;
pub mod file_local_store;
pub mod http_remote_store;
pub mod memory_local_store;
pub mod memory_remote_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::file_local_store::FileLocalSaveStore;
pub use crate::http_remote_store::HttpRemoteSaveStore;
pub use crate::memory_local_store::InMemoryLocalSaveStore;
pub use crate::memory_remote_store::InMemoryRemoteSaveStore;
pub use crate::paths::CanvasPaths;
