//! Optimistic mutations with snapshot rollback.
//!
//! Each mutation runs `idle -> optimistic-applied -> (confirmed |
//! rolled-back) -> settled`. The optimistic write and its snapshot both
//! strictly precede the network call, so a rollback always reverts to the
//! exact pre-call state. Namespace-wide invalidation runs on success and
//! failure alike: a single task's column move touches two column-scoped
//! entries plus the aggregate, and a failed call may still have partially
//! applied server-side.

use crate::cache::{QueryCache, ResourceKind};
use kanri_client::RetryPolicy;
use kanri_core::config::KanriConfig;
use kanri_core::drag::MoveIntent;
use kanri_core::error::{KanriError, Result};
use kanri_core::notify::{Notification, NotificationSink};
use kanri_core::task::{Task, TaskDraft, TaskId, TaskPatch, TaskRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Applies task mutations optimistically and reconciles with the server.
pub struct MutationCoordinator {
    repo: Arc<dyn TaskRepository>,
    cache: Arc<QueryCache>,
    sink: Arc<dyn NotificationSink>,
    retry: RetryPolicy,
    /// Task ids with a mutation currently in flight. A guarded id is not
    /// eligible for another mutation until the first settles.
    in_flight: RwLock<HashSet<TaskId>>,
}

impl MutationCoordinator {
    pub fn new(
        config: &KanriConfig,
        repo: Arc<dyn TaskRepository>,
        cache: Arc<QueryCache>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repo,
            cache,
            sink,
            retry: RetryPolicy::write(config),
            in_flight: RwLock::new(HashSet::new()),
        }
    }

    /// Whether a mutation for `id` is currently in flight.
    pub async fn is_mutating(&self, id: &TaskId) -> bool {
        self.in_flight.read().await.contains(id)
    }

    /// Updates a task with an optimistic cache write.
    ///
    /// The patch is written into every cache entry containing the task
    /// before the PATCH request goes out; on failure the pre-mutation
    /// snapshot is restored verbatim and an error notification is emitted.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(KanriError::validation("title", "title must not be empty"));
            }
        }
        self.acquire(id).await?;
        let result = self.run_update(id, patch).await;
        self.release(id).await;
        result
    }

    async fn run_update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        let mutation_id = Uuid::new_v4();

        // Cancel in-flight reads first: a fetch that already read the
        // server would otherwise land after the optimistic write and
        // overwrite it with pre-mutation data.
        self.cache
            .abandon_matching(|key| key.matches_namespace(ResourceKind::Tasks))
            .await;

        // Snapshot, then optimistic write, then network, in that order.
        let snapshot = self
            .cache
            .snapshot(|key| key.matches_namespace(ResourceKind::Tasks))
            .await;
        let touched = self
            .cache
            .set_matching(
                |key| key.matches_namespace(ResourceKind::Tasks),
                |value| value.rewrite_task(id, &patch),
            )
            .await;
        tracing::debug!(%mutation_id, task = %id, touched, "optimistic update applied");

        let repo = self.repo.clone();
        let result = self
            .retry
            .run("update_task", move || {
                let repo = repo.clone();
                let patch = patch.clone();
                let id = id.clone();
                async move { repo.update(&id, patch).await }
            })
            .await;

        match &result {
            Ok(_) => {
                tracing::debug!(%mutation_id, task = %id, "update confirmed");
                self.sink
                    .publish(Notification::success("Task updated successfully"));
            }
            Err(e) => {
                tracing::warn!(%mutation_id, task = %id, error = %e, "update failed, rolling back");
                self.cache.restore(&snapshot).await;
                self.sink
                    .publish(Notification::error("Failed to update task"));
            }
        }
        // Unconditional: reconcile with actual server state either way.
        self.cache.invalidate_namespace(ResourceKind::Tasks).await;
        result
    }

    /// Creates a task. No optimistic insertion: the new task's position is
    /// timestamp-derived and not worth speculating, so the namespace is
    /// simply invalidated once the server confirms.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task> {
        // Rejected client-side before any network call; surfaced on the
        // field, no notification.
        let draft = draft.validate()?;

        let repo = self.repo.clone();
        let result = self
            .retry
            .run("create_task", move || {
                let repo = repo.clone();
                let draft = draft.clone();
                async move { repo.create(draft).await }
            })
            .await;

        match &result {
            Ok(task) => {
                tracing::debug!(task = %task.id, column = %task.column, "task created");
                self.cache.invalidate_namespace(ResourceKind::Tasks).await;
                self.sink
                    .publish(Notification::success("Task created successfully"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "create failed");
                self.sink
                    .publish(Notification::error("Failed to create task"));
            }
        }
        result
    }

    /// Deletes a task. No optimistic removal; the unconditional namespace
    /// invalidation on settle makes the task disappear from every column
    /// view at once.
    pub async fn delete(&self, id: &TaskId) -> Result<()> {
        self.acquire(id).await?;
        let result = self.run_delete(id).await;
        self.release(id).await;
        result
    }

    async fn run_delete(&self, id: &TaskId) -> Result<()> {
        // Same in-flight cancellation as updates: a read begun before the
        // delete must not repopulate the namespace after it settles.
        self.cache
            .abandon_matching(|key| key.matches_namespace(ResourceKind::Tasks))
            .await;

        let repo = self.repo.clone();
        let result = self
            .retry
            .run("delete_task", move || {
                let repo = repo.clone();
                let id = id.clone();
                async move { repo.remove(&id).await }
            })
            .await;

        match &result {
            Ok(()) => {
                self.sink
                    .publish(Notification::success("Task deleted successfully"));
            }
            Err(e) => {
                tracing::warn!(task = %id, error = %e, "delete failed");
                self.sink
                    .publish(Notification::error("Failed to delete task"));
            }
        }
        self.cache.invalidate_namespace(ResourceKind::Tasks).await;
        result
    }

    /// Applies a drag-derived column move as a partial update.
    pub async fn move_task(&self, intent: &MoveIntent) -> Result<Task> {
        tracing::debug!(task = %intent.task, from = %intent.from, to = %intent.to, "moving task");
        self.update(&intent.task, TaskPatch::move_to(intent.to)).await
    }

    async fn acquire(&self, id: &TaskId) -> Result<()> {
        let mut in_flight = self.in_flight.write().await;
        if !in_flight.insert(id.clone()) {
            return Err(KanriError::conflict(id.to_string()));
        }
        Ok(())
    }

    async fn release(&self, id: &TaskId) {
        self.in_flight.write().await.remove(id);
    }
}
