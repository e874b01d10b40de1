//! The query cache / fetch orchestrator.
//!
//! Single source of truth for cached server data, addressable by composite
//! key. Concurrent fetches for one key share a single in-flight loader;
//! completed loads are kept fresh for a staleness window; invalidation
//! marks entries for refetch without dropping the visible data
//! (stale-while-revalidate). Optimistic writers capture snapshots here and
//! restore them verbatim on rollback.

use super::entry::{CacheEntry, CacheSnapshot, CachedValue, QueryStatus};
use super::key::{QueryKey, ResourceKind};
use kanri_core::config::KanriConfig;
use kanri_core::error::{KanriError, Result};
use kanri_core::task::{Page, Task, TaskId};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc, watch};

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEvent {
    pub key: QueryKey,
    pub kind: CacheEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// The entry's value changed (fetch completion or local write).
    Updated,
    /// The entry was marked stale and should be refetched on next access.
    Invalidated,
    /// The entry was removed.
    Evicted,
}

type FetchResult = Result<CachedValue>;

struct Pending {
    generation: u64,
    receiver: watch::Receiver<Option<FetchResult>>,
}

struct Subscriber {
    filter: Box<dyn Fn(&QueryKey) -> bool + Send + Sync>,
    sender: mpsc::UnboundedSender<CacheEvent>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, CacheEntry>,
    pending: HashMap<QueryKey, Pending>,
    subscribers: Vec<Subscriber>,
}

/// Keyed cache of in-flight and completed fetches.
///
/// Explicitly constructed once at application start and injected into every
/// component that reads or writes it; there is no global instance. All
/// writes happen under a single lock acquisition, so readers never observe
/// a partially rewritten payload shape.
pub struct QueryCache {
    inner: RwLock<Inner>,
    stale_after: Duration,
    gc_after: Duration,
}

impl QueryCache {
    pub fn new(config: &KanriConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            stale_after: config.stale_after(),
            gc_after: config.gc_after(),
        }
    }

    /// Returns the cached value for `key`, fetching it with `loader` if the
    /// entry is missing, stale or errored.
    ///
    /// A fresh entry is served without invoking the loader. If a load for
    /// the same key is already in flight, this call attaches to it instead
    /// of issuing a duplicate; all attached callers observe the single
    /// underlying result, including its failure. A loader whose generation
    /// has been superseded by the time it completes has its result
    /// discarded (last-write-wins by fetch generation, not arrival time).
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, loader: F) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult> + Send,
    {
        enum Action {
            Wait(watch::Receiver<Option<FetchResult>>),
            Run(u64, watch::Sender<Option<FetchResult>>),
        }

        let mut loader = Some(loader);
        loop {
            let action = {
                let mut guard = self.inner.write().await;
                let inner = &mut *guard;
                let now = Instant::now();

                let entry = inner
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| CacheEntry::new(now));
                entry.last_access = now;

                if entry.is_fresh(now, self.stale_after) {
                    if let Some(value) = &entry.value {
                        tracing::debug!(key = %key, "cache hit");
                        return Ok(value.clone());
                    }
                }

                if let Some(pending) = inner.pending.get(key) {
                    tracing::debug!(key = %key, "joining in-flight fetch");
                    Action::Wait(pending.receiver.clone())
                } else {
                    entry.generation += 1;
                    entry.status = QueryStatus::Loading;
                    let (tx, rx) = watch::channel(None);
                    inner.pending.insert(
                        key.clone(),
                        Pending {
                            generation: entry.generation,
                            receiver: rx,
                        },
                    );
                    Action::Run(entry.generation, tx)
                }
            };

            match action {
                Action::Wait(mut receiver) => {
                    match receiver.wait_for(|result| result.is_some()).await {
                        Ok(result) => {
                            if let Some(result) = result.as_ref() {
                                return result.clone();
                            }
                        }
                        // The in-flight fetch was abandoned without a
                        // result; go around and fetch ourselves.
                        Err(_) => continue,
                    }
                }
                Action::Run(generation, tx) => {
                    let Some(loader) = loader.take() else {
                        return Err(KanriError::internal("fetch loader consumed twice"));
                    };
                    let result = loader().await;

                    let mut guard = self.inner.write().await;
                    let inner = &mut *guard;
                    let superseded = !matches!(
                        inner.pending.get(key),
                        Some(pending) if pending.generation == generation
                    );
                    if superseded {
                        // A newer fetch owns this key now; dropping `tx`
                        // unsent sends our joiners around to it.
                        tracing::debug!(key = %key, generation, "late fetch result discarded");
                        return result;
                    }
                    inner.pending.remove(key);
                    if let Some(entry) = inner.entries.get_mut(key) {
                        match &result {
                            Ok(value) => entry.complete_success(value.clone(), Instant::now()),
                            Err(e) => entry.complete_error(e.clone()),
                        }
                    }
                    Self::emit(inner, key, CacheEventKind::Updated);
                    drop(guard);

                    let _ = tx.send(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    /// Abandons any in-flight fetch for `key` (consumer unmounted).
    ///
    /// The running loader's eventual result is discarded; attached waiters
    /// wake and retry, so a newer consumer's fetch takes over the key.
    pub async fn abandon(&self, key: &QueryKey) {
        let mut guard = self.inner.write().await;
        Self::abandon_key(&mut guard, key);
    }

    /// Abandons every in-flight fetch whose key matches `predicate`.
    ///
    /// Run before an optimistic write: a fetch that read the server before
    /// the write must not land afterwards and overwrite the written value
    /// with pre-mutation data. The generation bump discards the late
    /// result.
    pub async fn abandon_matching<P>(&self, predicate: P)
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut guard = self.inner.write().await;
        let keys: Vec<QueryKey> = guard
            .pending
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in keys {
            tracing::debug!(key = %key, "abandoning in-flight fetch");
            Self::abandon_key(&mut guard, &key);
        }
    }

    fn abandon_key(inner: &mut Inner, key: &QueryKey) {
        if inner.pending.remove(key).is_some() {
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.generation += 1;
                entry.stale = true;
                entry.status = if entry.value.is_some() {
                    QueryStatus::Success
                } else {
                    QueryStatus::Idle
                };
            }
        }
    }

    /// Marks every entry matching `predicate` stale. Idempotent; visible
    /// data is retained until the next fetch replaces it.
    pub async fn invalidate<P>(&self, predicate: P)
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let keys: Vec<QueryKey> = inner
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in keys {
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.stale = true;
            }
            Self::emit(inner, &key, CacheEventKind::Invalidated);
        }
    }

    /// Invalidates every entry of one resource namespace.
    pub async fn invalidate_namespace(&self, kind: ResourceKind) {
        self.invalidate(|key| key.matches_namespace(kind)).await;
    }

    /// Captures the current values of all entries matching `predicate`,
    /// ordered by key, for later rollback.
    pub async fn snapshot<P>(&self, predicate: P) -> CacheSnapshot
    where
        P: Fn(&QueryKey) -> bool,
    {
        let guard = self.inner.read().await;
        let mut captured: Vec<(QueryKey, Option<CachedValue>)> = guard
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();
        captured.sort_by_key(|(key, _)| key.to_string());
        CacheSnapshot { captured }
    }

    /// Writes the captured values back verbatim.
    ///
    /// Idempotent. Keys evicted since the capture are skipped rather than
    /// resurrected, so unrelated entries cannot be corrupted.
    pub async fn restore(&self, snapshot: &CacheSnapshot) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        for (key, value) in &snapshot.captured {
            let Some(entry) = inner.entries.get_mut(key) else {
                continue;
            };
            entry.value = value.clone();
            if entry.status != QueryStatus::Loading {
                entry.status = match value {
                    Some(_) => QueryStatus::Success,
                    None => QueryStatus::Idle,
                };
            }
            Self::emit(inner, key, CacheEventKind::Updated);
        }
    }

    /// Applies a pure transform to one entry's value, if present.
    pub async fn set_entry<F>(&self, key: &QueryKey, updater: F)
    where
        F: FnOnce(&mut CachedValue),
    {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if let Some(entry) = inner.entries.get_mut(key) {
            if let Some(value) = entry.value.as_mut() {
                updater(value);
                Self::emit(inner, key, CacheEventKind::Updated);
            }
        }
    }

    /// Applies a transform to every matching entry's value. The transform
    /// returns whether it changed anything; only touched entries emit an
    /// update event. Returns the number of touched entries.
    pub async fn set_matching<P, F>(&self, predicate: P, updater: F) -> usize
    where
        P: Fn(&QueryKey) -> bool,
        F: Fn(&mut CachedValue) -> bool,
    {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let keys: Vec<QueryKey> = inner
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        let mut touched = 0;
        for key in keys {
            let changed = inner
                .entries
                .get_mut(&key)
                .and_then(|entry| entry.value.as_mut())
                .map(|value| updater(value))
                .unwrap_or(false);
            if changed {
                touched += 1;
                Self::emit(inner, &key, CacheEventKind::Updated);
            }
        }
        touched
    }

    /// Appends a freshly loaded page to an accumulated entry, creating the
    /// entry if needed, and renews its freshness.
    pub async fn append_page(&self, key: &QueryKey, page: Page) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let now = Instant::now();
        let entry = inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(now));
        entry.last_access = now;
        let value = match entry.value.take() {
            Some(CachedValue::Pages(mut pages)) => {
                pages.push(page);
                CachedValue::Pages(pages)
            }
            Some(CachedValue::Page(first)) => CachedValue::Pages(vec![first, page]),
            None => CachedValue::Pages(vec![page]),
        };
        entry.complete_success(value, now);
        Self::emit(inner, key, CacheEventKind::Updated);
    }

    /// Current value for `key` without triggering a fetch.
    pub async fn peek(&self, key: &QueryKey) -> Option<CachedValue> {
        let mut guard = self.inner.write().await;
        let entry = guard.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        entry.value.clone()
    }

    pub async fn status(&self, key: &QueryKey) -> QueryStatus {
        let guard = self.inner.read().await;
        guard
            .entries
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or(QueryStatus::Idle)
    }

    pub async fn last_error(&self, key: &QueryKey) -> Option<KanriError> {
        let guard = self.inner.read().await;
        guard.entries.get(key).and_then(|entry| entry.error.clone())
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let guard = self.inner.read().await;
        guard
            .entries
            .get(key)
            .map(|entry| entry.stale || !entry.is_fresh(Instant::now(), self.stale_after))
            .unwrap_or(true)
    }

    /// Finds a task anywhere in the cache by id. Used to resolve drag
    /// sources and edit targets against currently cached data.
    pub async fn find_task(&self, id: &TaskId) -> Option<Task> {
        let guard = self.inner.read().await;
        guard
            .entries
            .values()
            .filter_map(|entry| entry.value.as_ref())
            .flat_map(|value| value.tasks())
            .find(|task| &task.id == id)
            .cloned()
    }

    /// Registers interest in keys matching `filter`; returns the event
    /// stream. Closed receivers are pruned on the next emission.
    pub async fn subscribe<P>(&self, filter: P) -> mpsc::UnboundedReceiver<CacheEvent>
    where
        P: Fn(&QueryKey) -> bool + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut guard = self.inner.write().await;
        guard.subscribers.push(Subscriber {
            filter: Box::new(filter),
            sender,
        });
        receiver
    }

    /// Marks entries past the staleness window for refetch. Called when the
    /// view regains foreground focus.
    pub async fn on_focus_regained(&self) {
        self.mark_aged_stale().await;
    }

    /// Marks entries past the staleness window for refetch. Called when
    /// network connectivity is restored.
    pub async fn on_reconnect(&self) {
        self.mark_aged_stale().await;
    }

    async fn mark_aged_stale(&self) {
        let now = Instant::now();
        let stale_after = self.stale_after;
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let aged: Vec<QueryKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now, stale_after))
            .map(|(key, _)| key.clone())
            .collect();
        for key in aged {
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.stale = true;
            }
            Self::emit(inner, &key, CacheEventKind::Invalidated);
        }
    }

    /// Drops entries unaccessed for the collection horizon. Entries with an
    /// in-flight fetch are kept.
    pub async fn gc(&self) {
        let now = Instant::now();
        let gc_after = self.gc_after;
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let expired: Vec<QueryKey> = inner
            .entries
            .iter()
            .filter(|(key, entry)| {
                !inner.pending.contains_key(key)
                    && now.saturating_duration_since(entry.last_access) >= gc_after
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            inner.entries.remove(&key);
            Self::emit(inner, &key, CacheEventKind::Evicted);
        }
    }

    /// Removes one entry outright.
    pub async fn evict(&self, key: &QueryKey) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if inner.entries.remove(key).is_some() {
            Self::emit(inner, key, CacheEventKind::Evicted);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn emit(inner: &mut Inner, key: &QueryKey, kind: CacheEventKind) {
        inner.subscribers.retain(|s| !s.sender.is_closed());
        for subscriber in &inner.subscribers {
            if (subscriber.filter)(key) {
                let _ = subscriber.sender.send(CacheEvent {
                    key: key.clone(),
                    kind,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use kanri_core::task::ColumnId;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config() -> KanriConfig {
        KanriConfig::default()
    }

    fn task(id: i64, column: ColumnId) -> Task {
        Task {
            id: TaskId::Int(id),
            title: format!("Task {}", id),
            description: String::new(),
            column,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            order: id,
        }
    }

    fn page_value(ids: &[i64]) -> CachedValue {
        CachedValue::Page(Page {
            tasks: ids.iter().map(|&i| task(i, ColumnId::Backlog)).collect(),
            has_more: false,
            total: ids.len(),
        })
    }

    fn backlog_key() -> QueryKey {
        QueryKey::column_infinite(ColumnId::Backlog, "")
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_loader() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = cache
                .fetch(&key, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(page_value(&[1])) }
                })
                .await
                .unwrap();
            assert_eq!(value, page_value(&[1]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_loader() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        let calls = Arc::new(AtomicU32::new(0));

        let fetches = (0..4).map(|_| {
            let calls = calls.clone();
            let key = key.clone();
            let cache = &cache;
            async move {
                cache
                    .fetch(&key, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok(page_value(&[1, 2]))
                        }
                    })
                    .await
            }
        });

        let results = join_all(fetches).await;
        for result in results {
            assert_eq!(result.unwrap(), page_value(&[1, 2]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_joiners_share_the_failure() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        let calls = Arc::new(AtomicU32::new(0));

        let fetches = (0..3).map(|_| {
            let calls = calls.clone();
            let key = key.clone();
            let cache = &cache;
            async move {
                cache
                    .fetch(&key, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Err(KanriError::network("down"))
                        }
                    })
                    .await
            }
        });

        for result in join_all(fetches).await {
            assert_eq!(result.unwrap_err(), KanriError::network("down"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The error is recorded but the entry survives for retry.
        assert_eq!(cache.status(&key).await, QueryStatus::Error);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch_and_is_idempotent() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        let calls = AtomicU32::new(0);

        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(page_value(&[1])) }
        };
        cache.fetch(&key, load).await.unwrap();
        assert!(!cache.is_stale(&key).await);

        // Invalidating twice leaves the same eventual state as once.
        cache.invalidate_namespace(ResourceKind::Tasks).await;
        cache.invalidate_namespace(ResourceKind::Tasks).await;
        assert!(cache.is_stale(&key).await);
        // Data stays visible while stale.
        assert_eq!(cache.peek(&key).await, Some(page_value(&[1])));

        cache.fetch(&key, load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_stale_value_visible() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();

        cache
            .fetch(&key, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();
        cache.invalidate_namespace(ResourceKind::Tasks).await;

        let result = cache
            .fetch(&key, || async { Err(KanriError::network("down")) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.peek(&key).await, Some(page_value(&[1])));
        assert_eq!(cache.last_error(&key).await, Some(KanriError::network("down")));
    }

    #[tokio::test]
    async fn test_snapshot_restore_roundtrip() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        cache
            .fetch(&key, || async { Ok(page_value(&[1, 2])) })
            .await
            .unwrap();

        let snapshot = cache.snapshot(|k| k.matches_namespace(ResourceKind::Tasks)).await;
        assert_eq!(snapshot.len(), 1);

        cache
            .set_entry(&key, |value| {
                *value = page_value(&[99]);
            })
            .await;
        assert_eq!(cache.peek(&key).await, Some(page_value(&[99])));

        cache.restore(&snapshot).await;
        assert_eq!(cache.peek(&key).await, Some(page_value(&[1, 2])));

        // Restoring again changes nothing.
        cache.restore(&snapshot).await;
        assert_eq!(cache.peek(&key).await, Some(page_value(&[1, 2])));
    }

    #[tokio::test]
    async fn test_restore_does_not_resurrect_evicted_keys() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        cache
            .fetch(&key, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();

        let snapshot = cache.snapshot(|k| k.matches_namespace(ResourceKind::Tasks)).await;
        cache.evict(&key).await;
        cache.restore(&snapshot).await;
        assert_eq!(cache.peek(&key).await, None);
    }

    #[tokio::test]
    async fn test_set_matching_rewrites_only_touched_entries() {
        let cache = QueryCache::new(&config());
        let backlog = backlog_key();
        let review = QueryKey::column_infinite(ColumnId::Review, "");
        cache
            .fetch(&backlog, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();
        cache
            .fetch(&review, || async { Ok(page_value(&[2])) })
            .await
            .unwrap();

        let touched = cache
            .set_matching(
                |k| k.matches_namespace(ResourceKind::Tasks),
                |value| {
                    value.rewrite_task(
                        &TaskId::Int(1),
                        &kanri_core::task::TaskPatch::move_to(ColumnId::Done),
                    )
                },
            )
            .await;
        assert_eq!(touched, 1);

        let moved = cache.find_task(&TaskId::Int(1)).await.unwrap();
        assert_eq!(moved.column, ColumnId::Done);
    }

    #[tokio::test]
    async fn test_subscribers_observe_updates_and_invalidations() {
        let cache = QueryCache::new(&config());
        let key = backlog_key();
        let mut events = cache
            .subscribe(|k: &QueryKey| k.matches_namespace(ResourceKind::Tasks))
            .await;

        cache
            .fetch(&key, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();
        cache.invalidate_namespace(ResourceKind::Tasks).await;

        assert_eq!(events.try_recv().unwrap().kind, CacheEventKind::Updated);
        assert_eq!(events.try_recv().unwrap().kind, CacheEventKind::Invalidated);
    }

    #[tokio::test]
    async fn test_gc_evicts_idle_entries() {
        let mut cfg = config();
        cfg.gc_after_secs = 0;
        let cache = QueryCache::new(&cfg);
        let key = backlog_key();
        cache
            .fetch(&key, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.gc().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_superseded_fetch_result_is_discarded() {
        let cache = Arc::new(QueryCache::new(&config()));
        let key = backlog_key();

        let slow_cache = cache.clone();
        let slow_key = key.clone();
        let slow = tokio::spawn(async move {
            slow_cache
                .fetch(&slow_key, || async {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    Ok(page_value(&[1]))
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.abandon(&key).await;

        // A newer fetch takes over the key and wins regardless of which
        // loader finishes last.
        let value = cache
            .fetch(&key, || async { Ok(page_value(&[2])) })
            .await
            .unwrap();
        assert_eq!(value, page_value(&[2]));

        slow.await.unwrap().unwrap();
        assert_eq!(cache.peek(&key).await, Some(page_value(&[2])));
    }

    #[tokio::test]
    async fn test_abandon_matching_covers_every_pending_key() {
        let cache = Arc::new(QueryCache::new(&config()));
        let backlog = backlog_key();
        let review = QueryKey::column_infinite(ColumnId::Review, "");

        for key in [backlog.clone(), review.clone()] {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .fetch(&key, || async {
                        tokio::time::sleep(Duration::from_millis(80)).await;
                        Ok(page_value(&[1]))
                    })
                    .await
            });
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache
            .abandon_matching(|k| k.matches_namespace(ResourceKind::Tasks))
            .await;

        // A post-abandon fetch owns the key; the slow loaders' results are
        // discarded when they land.
        let value = cache
            .fetch(&backlog, || async { Ok(page_value(&[2])) })
            .await
            .unwrap();
        assert_eq!(value, page_value(&[2]));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.peek(&backlog).await, Some(page_value(&[2])));
    }

    #[tokio::test]
    async fn test_focus_regain_marks_aged_entries() {
        let mut cfg = config();
        cfg.stale_after_secs = 0;
        let cache = QueryCache::new(&cfg);
        let key = backlog_key();
        cache
            .fetch(&key, || async { Ok(page_value(&[1])) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.on_focus_regained().await;
        assert!(cache.is_stale(&key).await);
        assert_eq!(cache.peek(&key).await, Some(page_value(&[1])));
    }
}
