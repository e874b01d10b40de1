//! Task repository trait.
//!
//! Defines the interface for remote task CRUD and column-scoped listing.

use super::model::{ColumnId, Page, Task, TaskDraft, TaskId, TaskPatch};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for task persistence and listing.
///
/// This trait decouples the board's cache and mutation layers from the
/// concrete transport (REST client, in-memory store for tests). It performs
/// no retries and swallows no errors: every failure propagates unchanged to
/// the orchestration layer, which owns retry and rollback policy.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Lists one page of a column's tasks, optionally filtered by search.
    ///
    /// The contract is filter-then-paginate: fetch every task in `column`,
    /// apply a case-insensitive substring match over title and description
    /// when `search` is non-empty, then slice `[(page-1)*limit, page*limit)`.
    /// The returned page carries the filtered total and whether further
    /// pages remain.
    ///
    /// This is O(column size) per page by design: it compensates for a
    /// backend that cannot combine filtering with pagination. A scalability
    /// boundary if columns grow large — the contract is fixed, the fetch
    /// strategy is the implementation's own affair as long as the observable
    /// semantics hold.
    async fn list_by_column(
        &self,
        column: ColumnId,
        page: u32,
        limit: usize,
        search: &str,
    ) -> Result<Page>;

    /// Creates a task from a validated draft.
    ///
    /// `created_at` and `order` are assigned client-side before submission,
    /// so a task's position is known before the server responds.
    async fn create(&self, draft: TaskDraft) -> Result<Task>;

    /// Applies a partial patch; the server returns the canonical task.
    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task>;

    /// Deletes a task. No payload on success.
    async fn remove(&self, id: &TaskId) -> Result<()>;
}
