//! Cache entry payloads and bookkeeping.

use super::key::QueryKey;
use kanri_core::error::KanriError;
use kanri_core::task::{Page, Task, TaskId, TaskPatch};
use std::time::{Duration, Instant};

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// The two payload shapes a task entry can carry.
///
/// One mutation routine serves both: `rewrite_task` dispatches on the tag
/// and rewrites matching task fields in place, leaving the surrounding
/// structure untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// A single page result.
    Page(Page),
    /// Accumulated pages of an infinite query, in page order.
    Pages(Vec<Page>),
}

impl CachedValue {
    /// Applies `patch` to every copy of the task with `id`, in whichever
    /// shape this value has. Returns whether anything was touched.
    pub fn rewrite_task(&mut self, id: &TaskId, patch: &TaskPatch) -> bool {
        let mut touched = false;
        for task in self.tasks_mut() {
            if &task.id == id {
                patch.apply_to(task);
                touched = true;
            }
        }
        touched
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.tasks().any(|task| &task.id == id)
    }

    /// Iterates all tasks in page order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        let pages: &[Page] = match self {
            CachedValue::Page(page) => std::slice::from_ref(page),
            CachedValue::Pages(pages) => pages,
        };
        pages.iter().flat_map(|page| page.tasks.iter())
    }

    fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        let pages: &mut [Page] = match self {
            CachedValue::Page(page) => std::slice::from_mut(page),
            CachedValue::Pages(pages) => pages,
        };
        pages.iter_mut().flat_map(|page| page.tasks.iter_mut())
    }

    /// Number of accumulated pages (1 for the single-page shape).
    pub fn page_count(&self) -> usize {
        match self {
            CachedValue::Page(_) => 1,
            CachedValue::Pages(pages) => pages.len(),
        }
    }

    /// Whether the last loaded page reported further pages behind it.
    /// An empty accumulation conservatively reports true.
    pub fn has_more(&self) -> bool {
        match self {
            CachedValue::Page(page) => page.has_more,
            CachedValue::Pages(pages) => pages.last().map(|p| p.has_more).unwrap_or(true),
        }
    }

    /// Filtered-set total from the first page's metadata.
    pub fn total(&self) -> usize {
        match self {
            CachedValue::Page(page) => page.total,
            CachedValue::Pages(pages) => pages.first().map(|p| p.total).unwrap_or(0),
        }
    }
}

/// One cache slot: payload plus freshness and fetch bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub(crate) value: Option<CachedValue>,
    pub(crate) status: QueryStatus,
    pub(crate) error: Option<KanriError>,
    pub(crate) fetched_at: Option<Instant>,
    pub(crate) last_access: Instant,
    pub(crate) stale: bool,
    /// Bumped whenever a new loader starts; a completing loader whose
    /// generation no longer matches is discarded (last-write-wins by fetch
    /// generation, not by arrival time).
    pub(crate) generation: u64,
}

impl CacheEntry {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            value: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            last_access: now,
            stale: false,
            generation: 0,
        }
    }

    /// Fresh means: a successful value, not invalidated, younger than the
    /// staleness window.
    pub(crate) fn is_fresh(&self, now: Instant, stale_after: Duration) -> bool {
        self.status == QueryStatus::Success
            && !self.stale
            && self
                .fetched_at
                .is_some_and(|at| now.saturating_duration_since(at) < stale_after)
    }

    pub(crate) fn complete_success(&mut self, value: CachedValue, now: Instant) {
        self.value = Some(value);
        self.status = QueryStatus::Success;
        self.error = None;
        self.fetched_at = Some(now);
        self.stale = false;
    }

    /// A failed load keeps any previously fetched value visible
    /// (stale-while-revalidate); only the status and error change.
    pub(crate) fn complete_error(&mut self, error: KanriError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
    }
}

/// A point-in-time capture of matching cache entries, used for rollback.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub(crate) captured: Vec<(QueryKey, Option<CachedValue>)>,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }
}
