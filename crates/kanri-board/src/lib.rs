//! Application layer for the kanri kanban board.
//!
//! Wires the query cache, per-column pagination and the mutation
//! coordinator around one injected repository. The cache is created once
//! here and passed by reference to every component that reads or writes
//! it; nothing in this crate is a global.

pub mod cache;
pub mod mutation;
pub mod pagination;

pub use cache::{CacheEvent, CacheEventKind, CacheSnapshot, CachedValue, QueryCache, QueryKey};
pub use mutation::MutationCoordinator;
pub use pagination::{ColumnPager, PagerPhase};

use kanri_client::RetryPolicy;
use kanri_core::board::BoardState;
use kanri_core::config::KanriConfig;
use kanri_core::drag::{DragEvent, MoveIntent};
use kanri_core::error::Result;
use kanri_core::notify::NotificationSink;
use kanri_core::search::SearchDebouncer;
use kanri_core::task::{ColumnId, Task, TaskRepository};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use strum::IntoEnumIterator;

/// The assembled board: one cache, one coordinator, pager factory and the
/// interaction state, built around an injected repository and sink.
pub struct Board {
    config: KanriConfig,
    cache: Arc<QueryCache>,
    repo: Arc<dyn TaskRepository>,
    mutations: MutationCoordinator,
    state: Mutex<BoardState>,
    debouncer: Mutex<SearchDebouncer>,
}

impl Board {
    pub fn new(
        config: KanriConfig,
        repo: Arc<dyn TaskRepository>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let cache = Arc::new(QueryCache::new(&config));
        let mutations = MutationCoordinator::new(&config, repo.clone(), cache.clone(), sink);
        let debouncer = Mutex::new(SearchDebouncer::new(config.debounce()));
        Self {
            config,
            cache,
            repo,
            mutations,
            state: Mutex::new(BoardState::new()),
            debouncer,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    /// The interaction state. Pure and synchronous; lock scope stays
    /// within one event-loop turn.
    pub fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A pager for `column`, bound to the currently committed search term.
    pub fn pager(&self, column: ColumnId) -> ColumnPager {
        let search = self.state().search_query().to_string();
        ColumnPager::new(
            self.cache.clone(),
            self.repo.clone(),
            RetryPolicy::read(&self.config),
            column,
            search,
            self.config.page_size,
        )
    }

    /// Pagers for the fixed column set, in board order.
    pub fn pagers(&self) -> Vec<ColumnPager> {
        ColumnId::iter().map(|column| self.pager(column)).collect()
    }

    /// Records a search keystroke; the value commits after the quiet
    /// window via [`Board::commit_search`].
    pub fn search_input(&self, text: impl Into<String>, now: Instant) {
        self.debouncer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .input(text, now);
    }

    /// Commits the debounced search term once its quiet window elapsed.
    ///
    /// Returns the committed term; the caller rebuilds its pagers against
    /// the new composite keys (old keys stay cached for back-navigation).
    pub fn commit_search(&self, now: Instant) -> Option<String> {
        let committed = self
            .debouncer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .poll(now)?;
        self.state().set_search_query(committed.clone());
        Some(committed)
    }

    /// Resolves the current edit target against cached data.
    ///
    /// `None` when no edit modal is open or the id is not cached; the
    /// consumer shows an empty form in that case rather than failing.
    pub async fn edit_target(&self) -> Option<Task> {
        let id = self.state().editing_task_id()?.clone();
        self.cache.find_task(&id).await
    }

    /// Routes a drag-and-drop event.
    ///
    /// Only a drag-end whose target column differs from the task's current
    /// (cached) column triggers a move; everything else just maintains the
    /// dragging state. Returns the updated task when a move was issued.
    pub async fn handle_drag(&self, event: DragEvent) -> Result<Option<Task>> {
        match event {
            DragEvent::Started { task } => {
                self.state().set_dragging(Some(task));
                Ok(None)
            }
            DragEvent::Over { target } => {
                tracing::trace!(target = %target, "drag over");
                Ok(None)
            }
            DragEvent::Ended { task, target } => {
                self.state().set_dragging(None);
                let Some(current) = self.cache.find_task(&task).await else {
                    // The dragged task is not in any cached page; nothing
                    // to move against.
                    return Ok(None);
                };
                match MoveIntent::from_drop(task, current.column, target) {
                    Some(intent) => self.mutations.move_task(&intent).await.map(Some),
                    None => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanri_client::InMemoryTaskRepository;
    use kanri_core::notify::MemorySink;
    use kanri_core::task::{TaskDraft, TaskId};
    use std::time::Duration;

    async fn board_with(backlog_count: usize) -> (Board, InMemoryTaskRepository) {
        let repo = InMemoryTaskRepository::new();
        for i in 0..backlog_count {
            repo.create(TaskDraft::new(
                format!("Task {}", i),
                "",
                ColumnId::Backlog,
            ))
            .await
            .unwrap();
        }
        let board = Board::new(
            KanriConfig::default(),
            Arc::new(repo.clone()),
            Arc::new(MemorySink::new()),
        );
        (board, repo)
    }

    #[tokio::test]
    async fn test_pagers_cover_the_fixed_column_set_in_order() {
        let (board, _repo) = board_with(0).await;
        let pagers = board.pagers();
        let columns: Vec<ColumnId> = pagers.iter().map(|p| p.column()).collect();
        assert_eq!(columns, ColumnId::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_drag_end_across_columns_moves_the_task() {
        let (board, repo) = board_with(2).await;
        board.pager(ColumnId::Backlog).fetch_next().await.unwrap();

        board
            .handle_drag(DragEvent::Started {
                task: TaskId::Int(1),
            })
            .await
            .unwrap();
        assert_eq!(board.state().dragging_task_id(), Some(&TaskId::Int(1)));

        let moved = board
            .handle_drag(DragEvent::Ended {
                task: TaskId::Int(1),
                target: Some(ColumnId::Review),
            })
            .await
            .unwrap()
            .expect("cross-column drop issues a move");
        assert_eq!(moved.column, ColumnId::Review);
        assert_eq!(board.state().dragging_task_id(), None);
        assert_eq!(
            repo.get(&TaskId::Int(1)).await.unwrap().column,
            ColumnId::Review
        );
    }

    #[tokio::test]
    async fn test_same_column_drop_is_a_noop() {
        let (board, repo) = board_with(1).await;
        board.pager(ColumnId::Backlog).fetch_next().await.unwrap();

        let result = board
            .handle_drag(DragEvent::Ended {
                task: TaskId::Int(1),
                target: Some(ColumnId::Backlog),
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(
            repo.get(&TaskId::Int(1)).await.unwrap().column,
            ColumnId::Backlog
        );
    }

    #[tokio::test]
    async fn test_drag_end_for_uncached_task_is_graceful() {
        let (board, _repo) = board_with(0).await;
        let result = board
            .handle_drag(DragEvent::Ended {
                task: TaskId::Int(99),
                target: Some(ColumnId::Done),
            })
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_search_commit_rebinds_pager_keys() {
        let (board, _repo) = board_with(3).await;
        let t0 = Instant::now();

        board.search_input("home", t0);
        board.search_input("homepage", t0 + Duration::from_millis(100));
        // Too early: nothing committed yet.
        assert_eq!(board.commit_search(t0 + Duration::from_millis(200)), None);
        assert_eq!(
            board.commit_search(t0 + Duration::from_millis(500)),
            Some("homepage".to_string())
        );

        let pager = board.pager(ColumnId::Backlog);
        assert_eq!(pager.search(), "homepage");
    }

    #[tokio::test]
    async fn test_edit_target_resolves_against_cache() {
        let (board, _repo) = board_with(1).await;
        board.pager(ColumnId::Backlog).fetch_next().await.unwrap();

        board.state().open_edit_modal(TaskId::Int(1));
        let target = board.edit_target().await.unwrap();
        assert_eq!(target.id, TaskId::Int(1));

        // Unknown id: representable, resolves to an empty form.
        board.state().open_edit_modal(TaskId::Int(42));
        assert!(board.edit_target().await.is_none());
    }
}
