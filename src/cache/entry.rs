//! Per-key cache state.

use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::transport::TransportError;

use super::keys::QueryKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Created but never fetched.
    Idle,
    /// A fetch is in flight; any previous value is still readable.
    Loading,
    Success,
    /// The last fetch failed; any previous value is still readable.
    Error,
}

/// Snapshot of one cache entry.
///
/// Entries are owned by [`ResourceCache`](super::ResourceCache); callers only
/// ever see clones.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: QueryKey,
    value: Option<Value>,
    status: FetchStatus,
    last_fetched_at: Option<Instant>,
    updated_at: Option<OffsetDateTime>,
    stale_after: Option<Duration>,
    invalidated: bool,
    error: Option<TransportError>,
    fetch_id: Option<u64>,
    generation: u64,
    revision: u64,
}

impl CacheEntry {
    pub(crate) fn new(key: QueryKey, stale_after: Option<Duration>) -> Self {
        Self {
            key,
            value: None,
            status: FetchStatus::Idle,
            last_fetched_at: None,
            updated_at: None,
            stale_after,
            invalidated: false,
            error: None,
            fetch_id: None,
            generation: 0,
            revision: 0,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    /// Monotonic time of the last successful fetch.
    pub fn last_fetched_at(&self) -> Option<Instant> {
        self.last_fetched_at
    }

    /// Wall-clock time the value last changed, for display.
    pub fn updated_at(&self) -> Option<OffsetDateTime> {
        self.updated_at
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// De-duplication token of the in-flight fetch, if any.
    pub fn fetch_id(&self) -> Option<u64> {
        self.fetch_id
    }

    /// Number of invalidations this entry has seen.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of server values this entry has stored.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// An entry is stale once invalidated or once its freshness window elapsed.
    /// Entries that never fetched successfully count as stale.
    pub fn is_stale_at(&self, now: Instant) -> bool {
        if self.invalidated {
            return true;
        }
        let Some(fetched_at) = self.last_fetched_at else {
            return true;
        };
        self.stale_after
            .is_some_and(|window| now.saturating_duration_since(fetched_at) > window)
    }

    /// A value that may be served without touching the network.
    pub(crate) fn fresh_value(&self, now: Instant) -> Option<&Value> {
        if self.status == FetchStatus::Success && !self.is_stale_at(now) {
            self.value.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn set_stale_after(&mut self, stale_after: Duration) {
        self.stale_after = Some(stale_after);
    }

    pub(crate) fn begin_fetch(&mut self, fetch_id: u64) {
        self.status = FetchStatus::Loading;
        self.fetch_id = Some(fetch_id);
    }

    pub(crate) fn finish_success(&mut self, value: Value, superseded: bool) {
        self.value = Some(value);
        self.status = FetchStatus::Success;
        self.last_fetched_at = Some(Instant::now());
        self.updated_at = Some(OffsetDateTime::now_utc());
        self.invalidated = superseded;
        self.error = None;
        self.fetch_id = None;
        self.revision += 1;
    }

    pub(crate) fn finish_error(&mut self, error: TransportError) {
        self.status = FetchStatus::Error;
        self.error = Some(error);
        self.fetch_id = None;
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
        self.generation += 1;
    }

    /// Replace the value without touching status or freshness.
    pub(crate) fn replace_value(&mut self, value: Option<Value>) -> Option<Value> {
        self.updated_at = Some(OffsetDateTime::now_utc());
        std::mem::replace(&mut self.value, value)
    }
}
