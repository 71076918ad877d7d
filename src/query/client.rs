//! Query store and subscriptions.
//!
//! [`QueryClient`] is the central state manager for reads. It owns the
//! typed cache entries, de-duplicates in-flight fetches per key, broadcasts
//! invalidation notifications, and guards settle ordering with a monotonic
//! sequence so a slow response can never clobber newer data.
//!
//! [`Query`] is the per-key handle views consume. `watch()` yields a stream
//! of [`QueryResult`] snapshots driven by the cache lifecycle:
//!
//! 1. Cached fresh data is emitted immediately
//! 2. Missing or stale data triggers a fetch (shared with every other
//!    subscriber of the same key)
//! 3. Invalidation of the key, or any prefix of it, triggers a refetch
//!
//! # Example
//!
//! ```rust,ignore
//! let queries = Arc::new(QueryClient::new());
//!
//! let query = Query::new(
//!     QueryKey::new("appointments").push("a1"),
//!     move || Box::pin(async move { http.get("/appointments/a1", &Params::new()).await }),
//!     queries.clone(),
//! );
//!
//! let mut updates = query.watch();
//! while let Some(result) = updates.next().await {
//!     // Loading, then Success or Error; Loading again after invalidation.
//! }
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;

use crate::error::ApiError;

use super::cache::{CacheEntry, EntryPhase};
use super::config::QueryConfig;
use super::key::QueryKey;

/// Future produced by a query fetcher.
pub type FetchFuture<V> = BoxFuture<'static, Result<V, ApiError>>;

type Fetcher<V> = Arc<dyn Fn() -> FetchFuture<V> + Send + Sync>;

/// The state of a query as seen by a subscriber.
#[derive(Debug, Clone)]
pub enum QueryState<V> {
    /// Query is disabled or has never been dispatched.
    Idle,
    /// A fetch is in flight and no fresh data is available.
    Loading,
    /// Query succeeded with data.
    Success {
        data: V,
        /// Whether the data is stale and a refetch is due.
        is_stale: bool,
    },
    /// Query failed. Data from a previous success is retained for UI
    /// stability.
    Error { error: ApiError, data: Option<V> },
}

/// A query snapshot delivered to subscribers.
#[derive(Debug, Clone)]
pub struct QueryResult<V> {
    pub state: QueryState<V>,
}

impl<V> QueryResult<V> {
    /// Returns the data if available: the current success value, or the
    /// retained value when the query is in the error state.
    pub const fn data(&self) -> Option<&V> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            QueryState::Error { data: Some(data), .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the error if the query failed.
    pub const fn error(&self) -> Option<&ApiError> {
        match &self.state {
            QueryState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, QueryState::Idle)
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error { .. })
    }

    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }
}

/// A single de-duplicated dispatch for a key.
struct Inflight<V> {
    seq: u64,
    future: Shared<FetchFuture<V>>,
}

impl<V> Clone for Inflight<V> {
    fn clone(&self) -> Self {
        Self {
            seq: self.seq,
            future: self.future.clone(),
        }
    }
}

/// Subscriber bookkeeping for one key.
struct WatcherSlot {
    count: usize,
    released_at: Option<Instant>,
}

/// Central cache store for queries.
///
/// Constructor-created and shared behind an [`Arc`]; all cache updates flow
/// through the dispatch/settle methods here, never through direct entry
/// writes. [`reset`](Self::reset) exists for test isolation.
pub struct QueryClient {
    entries: DashMap<QueryKey, Box<dyn Any + Send + Sync>>,
    inflight: DashMap<QueryKey, Box<dyn Any + Send + Sync>>,
    watchers: DashMap<QueryKey, WatcherSlot>,
    stale_marks: DashMap<QueryKey, Instant>,
    invalidation_tx: broadcast::Sender<QueryKey>,
    sequence: AtomicU64,
    config: QueryConfig,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

impl QueryClient {
    /// Creates a new query client with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    /// Creates a new query client with the given configuration.
    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            watchers: DashMap::new(),
            stale_marks: DashMap::new(),
            invalidation_tx,
            sequence: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Invalidates `key` and every key it is a prefix of.
    ///
    /// Matching entries are marked stale (so the next observation
    /// refetches even if nobody is watching right now), matching in-flight
    /// dispatches are detached (their late settles lose to the sequence
    /// guard), and active watchers are woken to refetch.
    pub fn invalidate(&self, key: &QueryKey) {
        self.sweep();
        tracing::debug!(key = %key, "invalidating");
        self.stale_marks.insert(key.clone(), Instant::now());
        self.inflight.retain(|k, _| !key.is_prefix_of(k));
        let _ = self.invalidation_tx.send(key.clone());
    }

    /// Subscribes to invalidation notifications.
    pub fn subscribe_invalidation(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }

    /// Clears all entries, marks, and in-flight dispatches.
    pub fn reset(&self) {
        self.entries.clear();
        self.inflight.clear();
        self.watchers.clear();
        self.stale_marks.clear();
    }

    /// Whether a cache entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Current state of the entry under `key`, `Idle` when absent.
    #[must_use]
    pub fn snapshot<V>(&self, key: &QueryKey) -> QueryState<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        match self.entry_snapshot::<V>(key) {
            Some(entry) => self.state_from_entry(key, &entry),
            None => QueryState::Idle,
        }
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn entry_snapshot<V>(&self, key: &QueryKey) -> Option<CacheEntry<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.entries
            .get(key)
            .and_then(|entry| entry.downcast_ref::<CacheEntry<V>>().cloned())
    }

    fn state_from_entry<V>(&self, key: &QueryKey, entry: &CacheEntry<V>) -> QueryState<V>
    where
        V: Clone,
    {
        match (&entry.phase, &entry.data, &entry.error) {
            (EntryPhase::Success, Some(data), _) => QueryState::Success {
                data: data.clone(),
                is_stale: self.is_entry_stale(key, entry),
            },
            (EntryPhase::Error, _, Some(error)) => QueryState::Error {
                error: error.clone(),
                data: entry.data.clone(),
            },
            (EntryPhase::Loading, _, _) => QueryState::Loading,
            _ => QueryState::Idle,
        }
    }

    fn is_entry_stale<V>(&self, key: &QueryKey, entry: &CacheEntry<V>) -> bool {
        entry.is_stale
            || entry.updated_at.elapsed() > self.config.stale_time
            || self.marked_stale(key, entry.updated_at)
    }

    fn marked_stale(&self, key: &QueryKey, updated_at: Instant) -> bool {
        self.stale_marks
            .iter()
            .any(|mark| mark.key().is_prefix_of(key) && *mark.value() > updated_at)
    }

    /// Runs `f` against the entry under `key` (created empty when absent)
    /// and returns the resulting state, all under the shard lock so
    /// concurrent settles cannot interleave.
    fn with_entry_mut<V, F>(&self, key: &QueryKey, f: F) -> QueryState<V>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce(&mut CacheEntry<V>),
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Some(entry) = occupied.get_mut().downcast_mut::<CacheEntry<V>>() {
                    f(entry);
                    let state = self.state_from_entry(key, entry);
                    return state;
                }
                // Same key reused with a different value type; start over.
                let mut entry = CacheEntry::<V>::empty();
                f(&mut entry);
                let state = self.state_from_entry(key, &entry);
                occupied.insert(Box::new(entry));
                state
            }
            Entry::Vacant(vacant) => {
                let mut entry = CacheEntry::<V>::empty();
                f(&mut entry);
                let state = self.state_from_entry(key, &entry);
                vacant.insert(Box::new(entry));
                state
            }
        }
    }

    /// Joins the in-flight dispatch for `key` or starts a new one.
    fn obtain_inflight<V>(&self, key: &QueryKey, fetcher: &Fetcher<V>) -> (u64, Shared<FetchFuture<V>>)
    where
        V: Clone + Send + Sync + 'static,
    {
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Some(inflight) = occupied.get().downcast_ref::<Inflight<V>>() {
                    return (inflight.seq, inflight.future.clone());
                }
                let seq = self.next_seq();
                let future = fetcher().shared();
                occupied.insert(Box::new(Inflight {
                    seq,
                    future: future.clone(),
                }));
                (seq, future)
            }
            Entry::Vacant(vacant) => {
                let seq = self.next_seq();
                let future = fetcher().shared();
                vacant.insert(Box::new(Inflight {
                    seq,
                    future: future.clone(),
                }));
                (seq, future)
            }
        }
    }

    /// Dispatches (or joins) a fetch for `key` and settles the cache.
    ///
    /// Returns the raw fetch outcome plus the cache state after the settle.
    /// A settle whose sequence is older than the entry's applied sequence
    /// is discarded, so the returned state may reflect a newer dispatch.
    pub(crate) async fn execute<V>(
        &self,
        key: &QueryKey,
        fetcher: &Fetcher<V>,
    ) -> (Result<V, ApiError>, QueryState<V>)
    where
        V: Clone + Send + Sync + 'static,
    {
        let (seq, shared) = self.obtain_inflight(key, fetcher);
        let _ = self.with_entry_mut::<V, _>(key, CacheEntry::begin_loading);

        let result = shared.await;

        // Only the dispatch owning this sequence clears the slot; a newer
        // dispatch may already have replaced it after an invalidation.
        self.inflight.remove_if(key, |_, slot| {
            slot.downcast_ref::<Inflight<V>>()
                .map_or(true, |inflight| inflight.seq == seq)
        });

        let state = match result.clone() {
            Ok(data) => self.with_entry_mut::<V, _>(key, move |entry| {
                if seq >= entry.applied_seq {
                    entry.succeed(data, seq);
                } else {
                    tracing::debug!(key = %key, seq, applied = entry.applied_seq, "discarding late settle");
                }
            }),
            Err(error) => self.with_entry_mut::<V, _>(key, move |entry| {
                if seq >= entry.applied_seq {
                    entry.fail(error, seq);
                } else {
                    tracing::debug!(key = %key, seq, applied = entry.applied_seq, "discarding late settle");
                }
            }),
        };

        self.touch_release(key);
        (result, state)
    }

    fn acquire(&self, key: &QueryKey) {
        self.sweep();
        match self.watchers.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.count += 1;
                slot.released_at = None;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WatcherSlot {
                    count: 1,
                    released_at: None,
                });
            }
        }
    }

    fn release(&self, key: &QueryKey) {
        if let Some(mut slot) = self.watchers.get_mut(key) {
            slot.count = slot.count.saturating_sub(1);
            if slot.count == 0 {
                slot.released_at = Some(Instant::now());
            }
        }
    }

    /// Records a release instant for entries nobody is watching, so
    /// results fetched imperatively still get garbage collected.
    fn touch_release(&self, key: &QueryKey) {
        match self.watchers.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.count == 0 {
                    slot.released_at = Some(Instant::now());
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WatcherSlot {
                    count: 0,
                    released_at: Some(Instant::now()),
                });
            }
        }
    }

    /// Evicts entries whose last subscriber left more than `cache_time`
    /// ago, and drops staleness marks too old to matter.
    fn sweep(&self) {
        let cache_time = self.config.cache_time;
        let now = Instant::now();
        self.watchers.retain(|key, slot| {
            let expired = slot.count == 0
                && slot
                    .released_at
                    .map_or(false, |at| now.duration_since(at) > cache_time);
            if expired {
                self.entries.remove(key);
            }
            !expired
        });
        self.stale_marks
            .retain(|_, at| now.duration_since(*at) <= cache_time);
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the subscriber slot when the last clone of a watch stream's
/// state is dropped.
struct WatchGuard {
    client: Arc<QueryClient>,
    key: QueryKey,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.client.release(&self.key);
    }
}

enum Phase {
    Initial,
    Fetch,
    Watching,
}

/// A keyed, cached, de-duplicated read.
///
/// Clones are lightweight handles to the same key, fetcher, and store.
pub struct Query<V> {
    key: QueryKey,
    fetcher: Fetcher<V>,
    client: Arc<QueryClient>,
    enabled: bool,
}

impl<V> Clone for Query<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
            client: self.client.clone(),
            enabled: self.enabled,
        }
    }
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new query with the given key, fetcher, and client.
    pub fn new<F>(key: QueryKey, fetcher: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn() -> FetchFuture<V> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
            enabled: true,
        }
    }

    /// Gates the subscription. A disabled query's `watch()` reports `Idle`
    /// and dispatches nothing.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Synchronous snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> QueryState<V> {
        if !self.enabled {
            return QueryState::Idle;
        }
        self.client.snapshot(&self.key)
    }

    /// Awaits one de-duplicated round trip, settling the cache.
    ///
    /// This is the imperative form; it dispatches regardless of
    /// [`enabled`](Self::enabled), which only gates subscriptions.
    pub async fn fetch(&self) -> Result<V, ApiError> {
        let (result, _) = self.client.execute(&self.key, &self.fetcher).await;
        result
    }

    /// Subscribes to the query.
    ///
    /// Emits the current state immediately (cached data when present,
    /// `Loading` otherwise), then a snapshot after every settle, then
    /// `Loading` plus a fresh snapshot whenever the key is invalidated.
    pub fn watch(&self) -> BoxStream<'static, QueryResult<V>> {
        if !self.enabled {
            return stream::once(async {
                QueryResult {
                    state: QueryState::Idle,
                }
            })
            .boxed();
        }

        let key = self.key.clone();
        let fetcher = self.fetcher.clone();
        let client = self.client.clone();

        client.acquire(&key);
        let guard = Arc::new(WatchGuard {
            client: client.clone(),
            key: key.clone(),
        });
        // Subscribe before the first snapshot so an invalidation arriving
        // mid-fetch is buffered rather than lost.
        let rx = client.subscribe_invalidation();

        stream::unfold((guard, rx, Phase::Initial), move |(guard, mut rx, phase)| {
            let key = key.clone();
            let fetcher = fetcher.clone();
            let client = client.clone();

            async move {
                match phase {
                    Phase::Initial => match client.snapshot::<V>(&key) {
                        QueryState::Success { data, is_stale } => {
                            let result = QueryResult {
                                state: QueryState::Success { data, is_stale },
                            };
                            if is_stale {
                                // Stale data: emit it, then refetch.
                                Some((result, (guard, rx, Phase::Fetch)))
                            } else {
                                Some((result, (guard, rx, Phase::Watching)))
                            }
                        }
                        _ => {
                            // No usable cache: emit Loading, then fetch.
                            let result = QueryResult {
                                state: QueryState::Loading,
                            };
                            Some((result, (guard, rx, Phase::Fetch)))
                        }
                    },

                    Phase::Fetch => {
                        let (_, state) = client.execute(&key, &fetcher).await;
                        Some((QueryResult { state }, (guard, rx, Phase::Watching)))
                    }

                    Phase::Watching => loop {
                        match rx.recv().await {
                            Ok(invalidated) if invalidated.is_prefix_of(&key) => {
                                let result = QueryResult {
                                    state: QueryState::Loading,
                                };
                                return Some((result, (guard, rx, Phase::Fetch)));
                            }
                            Ok(_) => {
                                // Different key, keep waiting.
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => {
                                // Missed notifications; refetch conservatively.
                                let result = QueryResult {
                                    state: QueryState::Loading,
                                };
                                return Some((result, (guard, rx, Phase::Fetch)));
                            }
                            Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    },
                }
            }
        })
        .boxed()
    }
}
