//! Canvas session coordination.
//!
//! Ties one undo/redo history to one auto-save service so that every edit is
//! recorded before it is persisted.

mod builder;
mod canvas_session;

pub use builder::CanvasSessionBuilder;
pub use canvas_session::CanvasSession;
