//! Task domain: model, paging and the repository seam.

pub mod model;
pub mod repository;

pub use model::{ColumnId, Page, Task, TaskDraft, TaskId, TaskPatch};
pub use repository::TaskRepository;
