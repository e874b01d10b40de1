//! Board interaction state.
//!
//! Pure synchronous UI state: committed search term, modal target and the
//! task currently being dragged. No I/O, no persistence — reset freely.

use crate::task::TaskId;

/// Which modal (if any) is open, and for which task.
///
/// A single tagged enum instead of an open-flag plus nullable id, so
/// "modal closed but edit target set" is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    /// Create form, no backing task.
    Create,
    /// Edit form for the given task id.
    ///
    /// The id is not guaranteed to resolve against cached data; a consumer
    /// that cannot find it renders an empty form rather than failing.
    Edit(TaskId),
}

/// Ephemeral interaction state for the board view.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    /// The committed (debounced) search term.
    search_query: String,
    modal: ModalState,
    dragging_task_id: Option<TaskId>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal != ModalState::Closed
    }

    /// The task being edited, if an edit modal is open.
    pub fn editing_task_id(&self) -> Option<&TaskId> {
        match &self.modal {
            ModalState::Edit(id) => Some(id),
            _ => None,
        }
    }

    /// Opens the create modal, clearing any edit target.
    pub fn open_create_modal(&mut self) {
        self.modal = ModalState::Create;
    }

    /// Opens the edit modal for `id`.
    pub fn open_edit_modal(&mut self, id: TaskId) {
        self.modal = ModalState::Edit(id);
    }

    /// Closes the modal and clears the edit target.
    pub fn close_modal(&mut self) {
        self.modal = ModalState::Closed;
    }

    pub fn dragging_task_id(&self) -> Option<&TaskId> {
        self.dragging_task_id.as_ref()
    }

    pub fn set_dragging(&mut self, id: Option<TaskId>) {
        self.dragging_task_id = id;
    }
}
