//! Domain layer for the kanri kanban board.
//!
//! Holds the task model, the fixed column set, the repository seam, pure
//! board interaction state, search debouncing, drag intents, notification
//! events and configuration. No I/O lives here beyond the repository trait
//! definition.

pub mod board;
pub mod config;
pub mod drag;
pub mod error;
pub mod notify;
pub mod search;
pub mod task;

// Re-export common error type
pub use error::{KanriError, Result};
