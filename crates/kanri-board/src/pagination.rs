//! Per-column infinite pagination.
//!
//! A `ColumnPager` drives incremental page loading for one (column, search)
//! key. A search term change means a different composite key, so a new
//! pager starts its own `Idle -> LoadingFirstPage` cycle while the old
//! key's accumulated pages stay cached independently. Page advance is
//! caller-driven; the pager never polls.

use crate::cache::{CachedValue, QueryCache, QueryKey};
use kanri_client::RetryPolicy;
use kanri_core::error::{KanriError, Result};
use kanri_core::task::{ColumnId, Task, TaskRepository};
use std::sync::Arc;

/// Where the pager is in its loading cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerPhase {
    Idle,
    LoadingFirstPage,
    Ready,
    LoadingNextPage,
}

/// Incremental page loader for one column under one search term.
pub struct ColumnPager {
    cache: Arc<QueryCache>,
    repo: Arc<dyn TaskRepository>,
    retry: RetryPolicy,
    column: ColumnId,
    search: String,
    page_size: usize,
    key: QueryKey,
    phase: PagerPhase,
    error: Option<KanriError>,
}

impl ColumnPager {
    pub fn new(
        cache: Arc<QueryCache>,
        repo: Arc<dyn TaskRepository>,
        retry: RetryPolicy,
        column: ColumnId,
        search: impl Into<String>,
        page_size: usize,
    ) -> Self {
        let search = search.into();
        let key = QueryKey::column_infinite(column, search.clone());
        Self {
            cache,
            repo,
            retry,
            column,
            search,
            page_size,
            key,
            phase: PagerPhase::Idle,
            error: None,
        }
    }

    pub fn column(&self) -> ColumnId {
        self.column
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn phase(&self) -> PagerPhase {
        self.phase
    }

    pub fn is_loading_first(&self) -> bool {
        self.phase == PagerPhase::LoadingFirstPage
    }

    pub fn is_loading_next(&self) -> bool {
        self.phase == PagerPhase::LoadingNextPage
    }

    /// The last fetch error, if the most recent page load failed.
    ///
    /// A failed column keeps its previously loaded pages visible and never
    /// affects sibling columns.
    pub fn error(&self) -> Option<&KanriError> {
        self.error.as_ref()
    }

    /// Accumulated tasks, flattened in page order.
    pub async fn tasks(&self) -> Vec<Task> {
        match self.cache.peek(&self.key).await {
            Some(value) => value.tasks().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Filtered-set total from the first page's metadata.
    pub async fn total(&self) -> usize {
        self.cache
            .peek(&self.key)
            .await
            .map(|value| value.total())
            .unwrap_or(0)
    }

    pub async fn loaded_pages(&self) -> usize {
        self.cache
            .peek(&self.key)
            .await
            .map(|value| value.page_count())
            .unwrap_or(0)
    }

    /// Whether further pages remain. Conservatively true before the first
    /// page has loaded.
    pub async fn has_more(&self) -> bool {
        self.cache
            .peek(&self.key)
            .await
            .map(|value| value.has_more())
            .unwrap_or(true)
    }

    /// Loads the next page.
    ///
    /// The first call runs the `Idle -> LoadingFirstPage` transition
    /// through the query cache (deduped, retried, possibly served fresh
    /// from a previous pager on the same key). Later calls append one page
    /// each. Once a page reports `has_more = false` this becomes a no-op.
    pub async fn fetch_next(&mut self) -> Result<()> {
        if matches!(
            self.phase,
            PagerPhase::LoadingFirstPage | PagerPhase::LoadingNextPage
        ) {
            return Ok(());
        }

        let loaded = self.loaded_pages().await;
        if loaded == 0 || self.cache.is_stale(&self.key).await {
            // Nothing loaded yet, or the entry was invalidated behind us:
            // run the first-page cycle (which revalidates everything).
            return self.fetch_first().await;
        }
        if !self.has_more().await {
            // Pagination is exhausted for this key.
            return Ok(());
        }
        self.fetch_page(loaded as u32 + 1).await
    }

    /// First-page load, or a full refetch of previously accumulated pages
    /// when the cached entry has gone stale (stale-while-revalidate: the
    /// old pages stay visible until the reload lands).
    async fn fetch_first(&mut self) -> Result<()> {
        self.phase = PagerPhase::LoadingFirstPage;

        let repo = self.repo.clone();
        let retry = self.retry;
        let column = self.column;
        let search = self.search.clone();
        let limit = self.page_size;
        // Refetch as many pages as were previously accumulated so a stale
        // reload does not truncate the visible list.
        let refetch_pages = self
            .cache
            .peek(&self.key)
            .await
            .map(|value| value.page_count())
            .unwrap_or(1)
            .max(1);

        let result = self
            .cache
            .fetch(&self.key, move || async move {
                let mut pages = Vec::new();
                for page_number in 1..=refetch_pages as u32 {
                    let repo = repo.clone();
                    let search = search.clone();
                    let page = retry
                        .run("list_by_column", move || {
                            let repo = repo.clone();
                            let search = search.clone();
                            async move {
                                repo.list_by_column(column, page_number, limit, &search).await
                            }
                        })
                        .await?;
                    let exhausted = !page.has_more;
                    pages.push(page);
                    if exhausted {
                        break;
                    }
                }
                Ok(CachedValue::Pages(pages))
            })
            .await;

        match result {
            Ok(_) => {
                self.phase = PagerPhase::Ready;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.phase = PagerPhase::Idle;
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn fetch_page(&mut self, page_number: u32) -> Result<()> {
        self.phase = PagerPhase::LoadingNextPage;
        tracing::debug!(column = %self.column, page = page_number, "loading next page");

        let repo = self.repo.clone();
        let search = self.search.clone();
        let column = self.column;
        let limit = self.page_size;
        let result = self
            .retry
            .run("list_by_column", move || {
                let repo = repo.clone();
                let search = search.clone();
                async move { repo.list_by_column(column, page_number, limit, &search).await }
            })
            .await;

        self.phase = PagerPhase::Ready;
        match result {
            Ok(page) => {
                self.cache.append_page(&self.key, page).await;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }
}
