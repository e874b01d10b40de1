//! Drag-and-drop intents.
//!
//! Gesture capture is an external capability; this module only models the
//! events it emits and the move intent a completed drop yields.

use crate::task::{ColumnId, TaskId};

/// Events emitted by the drag-and-drop capability.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    /// A drag gesture started on a task card.
    Started { task: TaskId },
    /// The pointer is currently over a column.
    Over { target: ColumnId },
    /// The gesture ended; `target` is `None` for a cancelled drop.
    Ended {
        task: TaskId,
        target: Option<ColumnId>,
    },
}

/// A request to move a task between columns.
///
/// Produced only by a drag-end whose target differs from the task's
/// current column; this is the sole trigger for a column-move update.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveIntent {
    pub task: TaskId,
    pub from: ColumnId,
    pub to: ColumnId,
}

impl MoveIntent {
    /// Interprets a drop. Cancelled drops and same-column drops yield no
    /// intent.
    pub fn from_drop(task: TaskId, from: ColumnId, target: Option<ColumnId>) -> Option<Self> {
        match target {
            Some(to) if to != from => Some(Self { task, from, to }),
            _ => None,
        }
    }
}
