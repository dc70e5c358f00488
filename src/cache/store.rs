//! The in-memory resource cache.
//!
//! One [`ResourceCache`] holds every [`CacheEntry`] of a session. Reads go
//! through [`ResourceCache::get_or_fetch`], which serves fresh values directly
//! and collapses concurrent misses for the same key into one fetch.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::{counter, histogram};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::transport::TransportError;

use super::config::CacheConfig;
use super::entry::{CacheEntry, FetchStatus};
use super::events::{EventBus, EventKind, Subscription};
use super::keys::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "careboard_cache_hit_total";
const METRIC_CACHE_MISS: &str = "careboard_cache_miss_total";
const METRIC_CACHE_DEDUP_JOIN: &str = "careboard_cache_dedup_join_total";
const METRIC_CACHE_FETCH_MS: &str = "careboard_cache_fetch_ms";

pub type FetchResult = Result<Value, TransportError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Per-read overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Freshness window for this key; replaces the cache default.
    pub stale_after: Option<Duration>,
}

impl FetchOptions {
    pub fn stale_after(window: Duration) -> Self {
        Self {
            stale_after: Some(window),
        }
    }
}

/// Value of one entry captured by [`ResourceCache::set_optimistic`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    value: Option<Value>,
    revision: u64,
}

impl Snapshot {
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Keep the revision but restore `value` instead of the captured one.
    pub fn with_value(self, value: Option<Value>) -> Self {
        Self { value, ..self }
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }
}

#[derive(Clone)]
struct InFlight {
    id: u64,
    generation: u64,
    handle: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, InFlight>,
}

struct Inner {
    config: CacheConfig,
    state: Mutex<CacheState>,
    events: EventBus,
    fetch_ids: AtomicU64,
}

enum Lookup {
    Fresh(Value),
    Pending(InFlight),
}

/// Process-wide query cache.
///
/// Cloning is cheap and yields a handle to the same entries.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl ResourceCache {
    pub fn new(config: CacheConfig) -> Self {
        let events = EventBus::new(config.event_capacity_non_zero());
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(CacheState::default()),
                events,
                fetch_ids: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the cached value for `key` if it is fresh, otherwise fetch it.
    ///
    /// Concurrent callers for the same key share one fetch. The fetch runs on
    /// its own task, so its result is stored even if every caller stops
    /// waiting. When the key is invalidated while the joined fetch was in
    /// flight, one further fetch is made so the caller never sees data older
    /// than the invalidation.
    ///
    /// Must be called within a tokio runtime.
    #[instrument(skip(self, fetcher, options), fields(key = %key))]
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        fetcher: F,
        options: FetchOptions,
    ) -> FetchResult
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        loop {
            let pending = match self.lookup(key, &fetcher, options) {
                Lookup::Fresh(value) => return Ok(value),
                Lookup::Pending(pending) => pending,
            };

            let result = pending.handle.await;
            if result.is_ok() && self.superseded(key, pending.generation) {
                debug!(fetch_id = pending.id, "Fetch superseded by invalidation; refetching");
                continue;
            }
            return result;
        }
    }

    /// Start a background fetch when `key` is missing, stale or failed.
    ///
    /// Returns immediately; a running fetch is left alone. Used by read
    /// accessors to revalidate while rendering whatever is cached.
    pub fn refresh<F, Fut>(&self, key: &QueryKey, fetcher: F, options: FetchOptions)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let _ = self.lookup(key, &fetcher, options);
    }

    /// Clone of the entry for `key`, if tracked.
    pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        mutex_lock(&self.inner.state, SOURCE, "peek")
            .entries
            .get(key)
            .cloned()
    }

    /// Every tracked key equal to or nested under `prefix`.
    pub fn keys_matching(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let state = mutex_lock(&self.inner.state, SOURCE, "keys_matching");
        let mut keys: Vec<QueryKey> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Mark every entry equal to or nested under `prefix` as stale.
    ///
    /// Performs no network I/O; the next read of an affected key refetches.
    /// Returns the number of entries marked.
    #[instrument(skip(self), fields(prefix = %prefix))]
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let affected: Vec<QueryKey> = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "invalidate");
            state
                .entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, entry)| {
                    entry.invalidate();
                    key.clone()
                })
                .collect()
        };

        debug!(affected = affected.len(), "Cache invalidated");
        for key in &affected {
            self.inner.events.publish(key.clone(), EventKind::Invalidated);
        }
        affected.len()
    }

    /// Replace the value of `key` with `updater(current)` without changing its
    /// status. Creates an idle entry when the key is untracked.
    ///
    /// Returns a [`Snapshot`] of the replaced value for [`Self::rollback`].
    pub fn set_optimistic<U>(&self, key: &QueryKey, updater: U) -> Snapshot
    where
        U: FnOnce(Option<Value>) -> Option<Value>,
    {
        let snapshot = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "set_optimistic");
            let default_window = self.inner.config.default_stale_after;
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(key.clone(), default_window));
            let current = entry.value().cloned();
            let next = updater(current.clone());
            entry.replace_value(next);
            Snapshot {
                value: current,
                revision: entry.revision(),
            }
        };

        self.inner.events.publish(key.clone(), EventKind::Optimistic);
        snapshot
    }

    /// Undo an optimistic update.
    ///
    /// Restores the snapshot value when no fetch stored a server value since
    /// the snapshot was taken. Otherwise the fetched value is kept and the
    /// entry is invalidated instead. Returns whether the value was restored.
    pub fn rollback(&self, key: &QueryKey, snapshot: Snapshot) -> bool {
        let kind = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "rollback");
            let Some(entry) = state.entries.get_mut(key) else {
                return false;
            };
            if entry.revision() == snapshot.revision {
                entry.replace_value(snapshot.value);
                EventKind::RolledBack
            } else {
                debug!(key = %key, "Entry refetched since optimistic update; invalidating instead");
                entry.invalidate();
                EventKind::Invalidated
            }
        };

        self.inner.events.publish(key.clone(), kind);
        kind == EventKind::RolledBack
    }

    /// Drop the entry for `key`.
    ///
    /// A fetch in flight keeps running. A read of the key made before it lands
    /// re-attaches to it; if nothing reads the key first, its result is dropped.
    pub fn evict(&self, key: &QueryKey) -> bool {
        let removed = mutex_lock(&self.inner.state, SOURCE, "evict")
            .entries
            .remove(key)
            .is_some();
        if removed {
            self.inner.events.publish(key.clone(), EventKind::Evicted);
        }
        removed
    }

    /// Drop every entry and detach every fetch in flight.
    ///
    /// Detached fetches still resolve for the callers already waiting on them,
    /// but their results are never stored and later reads start new fetches.
    pub fn clear(&self) {
        let detached = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "clear");
            state.entries.clear();
            let detached = state.in_flight.len();
            state.in_flight.clear();
            detached
        };
        debug!(detached, "Cache cleared");
        self.inner
            .events
            .publish(QueryKey::from_tokens(Vec::new()), EventKind::Cleared);
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        mutex_lock(&self.inner.state, SOURCE, "in_flight")
            .in_flight
            .len()
    }

    /// Subscribe to change notifications for every key.
    pub fn subscribe(&self) -> Subscription {
        self.inner.events.subscribe()
    }

    fn lookup<F, Fut>(&self, key: &QueryKey, fetcher: &F, options: FetchOptions) -> Lookup
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let now = Instant::now();
        let started = {
            let mut state = mutex_lock(&self.inner.state, SOURCE, "lookup");
            let CacheState { entries, in_flight } = &mut *state;

            let default_window = self.inner.config.default_stale_after;
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(key.clone(), default_window));
            if let Some(window) = options.stale_after {
                entry.set_stale_after(window);
            }

            if let Some(value) = entry.fresh_value(now) {
                counter!(METRIC_CACHE_HIT).increment(1);
                return Lookup::Fresh(value.clone());
            }

            if let Some(flight) = in_flight.get(key) {
                counter!(METRIC_CACHE_DEDUP_JOIN).increment(1);
                if entry.fetch_id() != Some(flight.id) {
                    // The entry was evicted and recreated while the fetch ran.
                    entry.begin_fetch(flight.id);
                }
                return Lookup::Pending(flight.clone());
            }

            counter!(METRIC_CACHE_MISS).increment(1);
            let id = self.inner.fetch_ids.fetch_add(1, Ordering::Relaxed);
            let generation = entry.generation();
            entry.begin_fetch(id);
            // Published under the lock so it precedes the fetch's own event.
            self.inner
                .events
                .publish(key.clone(), EventKind::FetchStarted);

            let flight = InFlight {
                id,
                generation,
                handle: self.spawn_fetch(key.clone(), id, generation, fetcher()),
            };
            in_flight.insert(key.clone(), flight.clone());
            flight
        };

        debug!(key = %key, fetch_id = started.id, "Fetch started");
        Lookup::Pending(started)
    }

    fn spawn_fetch<Fut>(&self, key: QueryKey, id: u64, generation: u64, fetch: Fut) -> SharedFetch
    where
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let started_at = Instant::now();
            let result = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(TransportError::Aborted("fetcher panicked".into())));
            histogram!(METRIC_CACHE_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
            inner.complete(&key, id, generation, &result);
            result
        });

        async move {
            task.await
                .unwrap_or_else(|err| Err(TransportError::Aborted(err.to_string())))
        }
        .boxed()
        .shared()
    }

    fn superseded(&self, key: &QueryKey, generation: u64) -> bool {
        self.peek(key)
            .is_some_and(|entry| entry.generation() != generation)
    }
}

impl Inner {
    fn complete(&self, key: &QueryKey, id: u64, generation: u64, result: &FetchResult) {
        let kind = {
            let mut state = mutex_lock(&self.state, SOURCE, "complete");
            if state.in_flight.get(key).is_some_and(|flight| flight.id == id) {
                state.in_flight.remove(key);
            }

            let Some(entry) = state.entries.get_mut(key) else {
                debug!(key = %key, fetch_id = id, "Fetch finished for evicted key; result dropped");
                return;
            };
            if entry.fetch_id() != Some(id) {
                return;
            }

            match result {
                Ok(value) => {
                    let superseded = entry.generation() != generation;
                    entry.finish_success(value.clone(), superseded);
                    EventKind::Fetched
                }
                Err(err) => {
                    warn!(key = %key, fetch_id = id, error = %err, "Fetch failed; keeping previous value");
                    entry.finish_error(err.clone());
                    EventKind::FetchFailed
                }
            }
        };

        self.events.publish(key.clone(), kind);
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// True when `entry` has a usable value while in an error or loading state.
pub fn is_serving_previous(entry: &CacheEntry) -> bool {
    entry.value().is_some()
        && matches!(entry.status(), FetchStatus::Loading | FetchStatus::Error)
}
