//! Canvas snapshot model.

pub mod model;

pub use model::{CanvasConnection, CanvasNode, CanvasState, Position};
