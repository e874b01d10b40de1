//! REST-backed TaskRepository implementation.
//!
//! Endpoints:
//! ```text
//! GET    /tasks?column=<id>   -> [Task]
//! POST   /tasks               -> Task
//! PATCH  /tasks/:id           -> Task
//! DELETE /tasks/:id           -> ()
//! ```
//!
//! The backend filters by column only; search filtering and pagination are
//! applied client-side against the column's full task list (the shared
//! filter-then-paginate contract in `kanri_core::task::model`).

use async_trait::async_trait;
use chrono::Utc;
use kanri_core::config::KanriConfig;
use kanri_core::error::{KanriError, Result};
use kanri_core::task::model::filter_and_paginate;
use kanri_core::task::{ColumnId, Page, Task, TaskDraft, TaskId, TaskPatch, TaskRepository};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// Wire body for task creation: the draft plus client-assigned stamps.
#[derive(Debug, Serialize)]
struct NewTaskBody {
    #[serde(flatten)]
    draft: TaskDraft,
    #[serde(rename = "createdAt")]
    created_at: String,
    order: i64,
}

/// Process-wide monotonic order stamp.
///
/// Millisecond timestamps alone can collide when two tasks are created
/// within the same millisecond; bumping past the previous stamp keeps
/// within-column ordering deterministic.
fn next_order_stamp() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);
    let now = Utc::now().timestamp_millis();
    LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
        Some(prev.max(now - 1) + 1)
    })
    .map(|prev| prev.max(now - 1) + 1)
    .unwrap_or(now)
}

/// Task repository over the REST task API.
pub struct RestTaskRepository {
    http: reqwest::Client,
    base_url: String,
}

impl RestTaskRepository {
    /// Creates a repository against the configured API base URL.
    pub fn new(config: &KanriConfig) -> Self {
        Self::with_base_url(config.api_url.clone())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/tasks/{}", self.base_url, id)
    }

    /// Maps a non-2xx response to the error taxonomy.
    async fn check(res: reqwest::Response, id: Option<&TaskId>) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(KanriError::not_found("task", id.to_string()));
            }
        }
        let message = res.text().await.unwrap_or_default();
        Err(KanriError::api(status.as_u16(), message))
    }
}

#[async_trait]
impl TaskRepository for RestTaskRepository {
    async fn list_by_column(
        &self,
        column: ColumnId,
        page: u32,
        limit: usize,
        search: &str,
    ) -> Result<Page> {
        let res = self
            .http
            .get(self.tasks_url())
            .query(&[("column", column.as_str())])
            .send()
            .await?;
        let all_tasks: Vec<Task> = Self::check(res, None).await?.json().await?;

        tracing::debug!(
            column = %column,
            fetched = all_tasks.len(),
            page,
            "listing column tasks"
        );
        Ok(filter_and_paginate(all_tasks, page, limit, search))
    }

    async fn create(&self, draft: TaskDraft) -> Result<Task> {
        let draft = draft.validate()?;
        let body = NewTaskBody {
            draft,
            created_at: Utc::now().to_rfc3339(),
            order: next_order_stamp(),
        };
        let res = self.http.post(self.tasks_url()).json(&body).send().await?;
        Ok(Self::check(res, None).await?.json().await?)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        let res = self
            .http
            .patch(self.task_url(id))
            .json(&patch)
            .send()
            .await?;
        Ok(Self::check(res, Some(id)).await?.json().await?)
    }

    async fn remove(&self, id: &TaskId) -> Result<()> {
        let res = self.http.delete(self.task_url(id)).send().await?;
        Self::check(res, Some(id)).await?;
        Ok(())
    }
}
