//! In-memory TaskRepository for tests and demos.
//!
//! Implements the same filter-then-paginate listing contract as the REST
//! repository, with auto-incrementing integer ids, injectable failures and
//! an optional artificial latency so tests can observe in-flight states.

use async_trait::async_trait;
use chrono::Utc;
use kanri_core::error::{KanriError, Result};
use kanri_core::task::model::filter_and_paginate;
use kanri_core::task::{ColumnId, Page, Task, TaskDraft, TaskId, TaskPatch, TaskRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    tasks: Vec<Task>,
    next_id: i64,
    order_seq: i64,
    fail_next: Option<KanriError>,
    latency: Option<Duration>,
}

impl Store {
    fn next_order(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.order_seq = now.max(self.order_seq + 1);
        self.order_seq
    }
}

/// Shared in-memory task store.
///
/// Clones share the same underlying store, so a test can hold one handle
/// for seeding/injection while the system under test holds another.
#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a task directly, bypassing create semantics. Ids supplied by
    /// the caller are kept as-is.
    pub async fn seed(&self, tasks: impl IntoIterator<Item = Task>) {
        let mut store = self.store.write().await;
        for task in tasks {
            if let TaskId::Int(n) = &task.id {
                store.next_id = store.next_id.max(*n);
            }
            store.order_seq = store.order_seq.max(task.order);
            store.tasks.push(task);
        }
    }

    /// Makes the next repository operation fail with `error`.
    pub async fn fail_next(&self, error: KanriError) {
        self.store.write().await.fail_next = Some(error);
    }

    /// Adds artificial latency to every operation.
    pub async fn set_latency(&self, latency: Duration) {
        self.store.write().await.latency = Some(latency);
    }

    /// Snapshot of a task by id, for assertions.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let store = self.store.read().await;
        store.tasks.iter().find(|t| &t.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Applies injected latency, then the injected failure if one is armed.
    async fn begin_op(&self) -> Result<()> {
        let latency = self.store.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.store.write().await.fail_next.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list_by_column(
        &self,
        column: ColumnId,
        page: u32,
        limit: usize,
        search: &str,
    ) -> Result<Page> {
        self.begin_op().await?;
        let store = self.store.read().await;
        let column_tasks: Vec<Task> = store
            .tasks
            .iter()
            .filter(|t| t.column == column)
            .cloned()
            .collect();
        Ok(filter_and_paginate(column_tasks, page, limit, search))
    }

    async fn create(&self, draft: TaskDraft) -> Result<Task> {
        self.begin_op().await?;
        let draft = draft.validate()?;
        let mut store = self.store.write().await;
        store.next_id += 1;
        let order = store.next_order();
        let task = Task {
            id: TaskId::Int(store.next_id),
            title: draft.title,
            description: draft.description,
            column: draft.column,
            created_at: Utc::now().to_rfc3339(),
            order,
        };
        store.tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        self.begin_op().await?;
        let mut store = self.store.write().await;
        let task = store
            .tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| KanriError::not_found("task", id.to_string()))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn remove(&self, id: &TaskId) -> Result<()> {
        self.begin_op().await?;
        let mut store = self.store.write().await;
        let before = store.tasks.len();
        store.tasks.retain(|t| &t.id != id);
        if store.tasks.len() == before {
            return Err(KanriError::not_found("task", id.to_string()));
        }
        Ok(())
    }
}
