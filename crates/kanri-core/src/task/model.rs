//! Task domain model.
//!
//! This module contains the core entities and value objects for the kanban
//! board: tasks, the fixed column set, sparse patches for partial updates
//! and the page shape returned by column listings.

use crate::error::{KanriError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;

/// Identifier of a task.
///
/// The backing store hands out either integer or string ids, so both are
/// representable. Serialization is untagged: an integer id round-trips as a
/// JSON number, a string id as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Int(i64),
    Str(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Int(n) => write!(f, "{}", n),
            TaskId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Int(n)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::Str(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId::Str(s)
    }
}

/// One of the four fixed workflow stages a task can occupy.
///
/// The board renders exactly these columns, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ColumnId {
    Backlog,
    InProgress,
    Review,
    Done,
}

impl ColumnId {
    /// All columns in board order.
    pub const ALL: [ColumnId; 4] = [
        ColumnId::Backlog,
        ColumnId::InProgress,
        ColumnId::Review,
        ColumnId::Done,
    ];

    /// The wire identifier for this column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnId::Backlog => "backlog",
            ColumnId::InProgress => "in_progress",
            ColumnId::Review => "review",
            ColumnId::Done => "done",
        }
    }

    /// The human-readable display label for this column.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnId::Backlog => "Backlog",
            ColumnId::InProgress => "In Progress",
            ColumnId::Review => "Review",
            ColumnId::Done => "Done",
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work item on the kanban board.
///
/// A task belongs to exactly one column at any instant; the `column` field
/// is the sole source of truth for which board lane renders it. `id`,
/// `created_at` and `order` are set at creation and never change afterwards
/// (`order` drives the stable sort within a column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub column: ColumnId,
    /// Creation timestamp, RFC 3339.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub order: i64,
}

impl Task {
    /// Case-insensitive substring match over title and description.
    ///
    /// `needle` must already be lowercased by the caller.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Form data for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub column: ColumnId,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, column: ColumnId) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            column,
        }
    }

    /// Validates the draft client-side and returns it with the title trimmed.
    ///
    /// An empty or whitespace-only title is rejected with a field-level
    /// validation error before any network call is made.
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            return Err(KanriError::validation("title", "title must not be empty"));
        }
        self.title = trimmed.to_string();
        Ok(self)
    }
}

/// A sparse partial update for a task.
///
/// Only the set fields are serialized, so a PATCH body carries exactly the
/// touched fields and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TaskPatch {
    /// A patch that only moves the task to another column.
    pub fn move_to(column: ColumnId) -> Self {
        Self {
            column: Some(column),
            ..Self::default()
        }
    }

    /// Writes the set fields into `task` in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(column) = self.column {
            task.column = column;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.column.is_none()
            && self.order.is_none()
    }
}

/// One page of tasks for a column listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub tasks: Vec<Task>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    /// Total size of the filtered set the page was sliced from.
    pub total: usize,
}

impl Page {
    /// An empty page with nothing behind it.
    pub fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            has_more: false,
            total: 0,
        }
    }
}

/// Applies the shared filter-then-paginate contract to a column's tasks.
///
/// Sorts by `order` ascending (ties broken by id for determinism), applies
/// the case-insensitive substring filter over title and description when
/// `search` is non-empty, then slices `[(page-1)*limit, page*limit)`.
/// `has_more` is true iff the slice end falls short of the filtered total.
///
/// Page numbers are 1-based; page 0 is treated as page 1.
pub fn filter_and_paginate(mut tasks: Vec<Task>, page: u32, limit: usize, search: &str) -> Page {
    tasks.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    });

    let search = search.trim().to_lowercase();
    if !search.is_empty() {
        tasks.retain(|task| task.matches_search(&search));
    }

    let total = tasks.len();
    let page = page.max(1) as usize;
    let start = (page - 1) * limit;
    let end = (start + limit).min(total);
    let slice = if start < total {
        tasks[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        tasks: slice,
        has_more: end < total,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, title: &str, column: ColumnId, order: i64) -> Task {
        Task {
            id: TaskId::Int(id),
            title: title.to_string(),
            description: format!("Description for {}", title),
            column,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            order,
        }
    }

    #[test]
    fn test_task_id_serialization_is_untagged() {
        let int_id: TaskId = serde_json::from_str("7").unwrap();
        assert_eq!(int_id, TaskId::Int(7));
        let str_id: TaskId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(str_id, TaskId::Str("a1b2".to_string()));
        assert_eq!(serde_json::to_string(&TaskId::Int(7)).unwrap(), "7");
    }

    #[test]
    fn test_column_wire_names() {
        assert_eq!(
            serde_json::to_string(&ColumnId::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(ColumnId::ALL.len(), 4);
        assert_eq!(ColumnId::ALL[0], ColumnId::Backlog);
        assert_eq!(ColumnId::Done.label(), "Done");
    }

    #[test]
    fn test_draft_validation_trims_and_rejects_blank() {
        let ok = TaskDraft::new("  Ship it  ", "", ColumnId::Backlog)
            .validate()
            .unwrap();
        assert_eq!(ok.title, "Ship it");

        let err = TaskDraft::new("   ", "", ColumnId::Backlog)
            .validate()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = TaskPatch::move_to(ColumnId::Review);
        let body = serde_json::to_string(&patch).unwrap();
        assert_eq!(body, "{\"column\":\"review\"}");
    }

    #[test]
    fn test_patch_apply_to() {
        let mut t = task(1, "Old", ColumnId::Backlog, 10);
        let patch = TaskPatch {
            title: Some("New".to_string()),
            column: Some(ColumnId::Done),
            ..TaskPatch::default()
        };
        patch.apply_to(&mut t);
        assert_eq!(t.title, "New");
        assert_eq!(t.column, ColumnId::Done);
        // Untouched fields survive.
        assert_eq!(t.order, 10);
    }

    #[test]
    fn test_paginate_fifteen_tasks_page_size_ten() {
        let tasks: Vec<Task> = (0..15)
            .map(|i| task(i, &format!("Task {}", i), ColumnId::Backlog, i))
            .collect();

        let first = filter_and_paginate(tasks.clone(), 1, 10, "");
        assert_eq!(first.tasks.len(), 10);
        assert!(first.has_more);
        assert_eq!(first.total, 15);

        let second = filter_and_paginate(tasks, 2, 10, "");
        assert_eq!(second.tasks.len(), 5);
        assert!(!second.has_more);
        assert_eq!(second.total, 15);
    }

    #[test]
    fn test_paginate_search_is_case_insensitive() {
        let tasks = vec![
            task(1, "Fix HOMEPAGE banner", ColumnId::Backlog, 1),
            task(2, "Unrelated", ColumnId::Backlog, 2),
        ];
        let page = filter_and_paginate(tasks, 1, 10, "homepage");
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].id, TaskId::Int(1));
    }

    #[test]
    fn test_paginate_no_matches_is_empty_terminal_page() {
        let tasks = vec![task(1, "Fix login", ColumnId::Backlog, 1)];
        let page = filter_and_paginate(tasks, 1, 10, "homepage");
        assert!(page.tasks.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_paginate_sorts_by_order() {
        let tasks = vec![
            task(1, "Third", ColumnId::Backlog, 30),
            task(2, "First", ColumnId::Backlog, 10),
            task(3, "Second", ColumnId::Backlog, 20),
        ];
        let page = filter_and_paginate(tasks, 1, 10, "");
        let titles: Vec<&str> = page.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }
}
