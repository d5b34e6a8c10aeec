//! Application layer for StackCanvas.
//!
//! This crate coordinates the domain history with the persistence stores:
//! debounced auto-save, the per-canvas editing session, and keyboard
//! shortcut handling.

pub mod auto_save;
pub mod session;
pub mod shortcuts;

pub use auto_save::AutoSaveService;
pub use session::{CanvasSession, CanvasSessionBuilder};
pub use shortcuts::{FocusTarget, KeyChord, ShortcutAction, resolve_shortcut};
