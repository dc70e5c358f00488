//! Cache change notifications.
//!
//! Every state change of an entry is broadcast as a [`CacheEvent`]. UI bindings
//! subscribe and re-render the views reading the affected key.

use std::sync::Mutex;

use time::OffsetDateTime;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::keys::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic epoch for ordering events.
///
/// Each event gets a unique epoch within one cache instance, and subscribers
/// receive events in epoch order.
pub type Epoch = u64;

/// A change to one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier (UUIDv4).
    pub id: Uuid,
    /// Monotonic epoch for ordering within this cache.
    pub epoch: Epoch,
    /// The entry that changed.
    pub key: QueryKey,
    /// What happened.
    pub kind: EventKind,
    /// When the event was created.
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(key: QueryKey, kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            key,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A network fetch started; the entry is loading.
    FetchStarted,
    /// A fetch stored a fresh value.
    Fetched,
    /// A fetch failed; the previous value was kept.
    FetchFailed,
    /// The entry was marked stale.
    Invalidated,
    /// The value was replaced ahead of server confirmation.
    Optimistic,
    /// An optimistic value was reverted.
    RolledBack,
    /// The entry was removed.
    Evicted,
    /// Every entry was removed.
    Cleared,
}

/// Broadcast channel plus epoch counter shared by one cache.
pub(crate) struct EventBus {
    sender: broadcast::Sender<CacheEvent>,
    /// Held while sending so epochs reach the channel in order.
    next_epoch: Mutex<Epoch>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_epoch: Mutex::new(0),
        }
    }

    /// Publish an event to every live subscriber.
    pub(crate) fn publish(&self, key: QueryKey, kind: EventKind) {
        let mut next_epoch = mutex_lock(&self.next_epoch, SOURCE, "publish");
        let event = CacheEvent::new(key, kind, *next_epoch);
        *next_epoch += 1;

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?kind,
            key = %event.key,
            "Cache event published"
        );

        // No receivers is fine; nobody is watching yet.
        let _ = self.sender.send(event);
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            scope: None,
        }
    }
}

/// A stream of [`CacheEvent`]s, optionally narrowed to one key scope.
pub struct Subscription {
    receiver: broadcast::Receiver<CacheEvent>,
    scope: Option<QueryKey>,
}

impl Subscription {
    /// Only deliver events for keys equal to or nested under `prefix`.
    pub fn for_prefix(mut self, prefix: QueryKey) -> Self {
        self.scope = Some(prefix);
        self
    }

    fn in_scope(&self, event: &CacheEvent) -> bool {
        match &self.scope {
            Some(prefix) => event.kind == EventKind::Cleared || event.key.starts_with(prefix),
            None => true,
        }
    }

    /// Wait for the next matching event. Returns `None` once the cache is dropped.
    pub async fn next(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.in_scope(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cache subscriber lagged; skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Return the next buffered matching event without waiting.
    pub fn try_next(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.in_scope(&event) => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cache subscriber lagged; skipping ahead");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_key;

    #[test]
    fn epoch_monotonicity() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe();

        for _ in 0..3 {
            bus.publish(query_key!["planItems"], EventKind::Invalidated);
        }

        let epochs: Vec<Epoch> = std::iter::from_fn(|| sub.try_next().map(|e| e.epoch)).collect();
        assert_eq!(epochs, vec![0, 1, 2]);
    }

    #[test]
    fn concurrent_publishers_deliver_epochs_in_order() {
        let bus = EventBus::new(512);
        let mut sub = bus.subscribe();

        std::thread::scope(|scope| {
            for thread in 0..4 {
                let bus = &bus;
                scope.spawn(move || {
                    for _ in 0..100 {
                        bus.publish(query_key!["documents", thread], EventKind::Fetched);
                    }
                });
            }
        });

        let epochs: Vec<Epoch> = std::iter::from_fn(|| sub.try_next().map(|e| e.epoch)).collect();
        assert_eq!(epochs.len(), 400);
        assert!(epochs.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::new(8);
        bus.publish(query_key!["planItems"], EventKind::Invalidated);
    }

    #[test]
    fn scoped_subscription_filters_other_keys() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe().for_prefix(query_key!["documents"]);

        bus.publish(query_key!["planItems"], EventKind::Invalidated);
        bus.publish(query_key!["documents", 7], EventKind::Fetched);
        bus.publish(query_key!["journalLogs"], EventKind::Cleared);

        let first = sub.try_next().expect("document event");
        assert_eq!(first.key, query_key!["documents", 7]);
        assert_eq!(first.kind, EventKind::Fetched);

        let second = sub.try_next().expect("clear reaches every scope");
        assert_eq!(second.kind, EventKind::Cleared);

        assert!(sub.try_next().is_none());
    }

    #[test]
    fn lagged_subscriber_skips_ahead() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for _ in 0..5 {
            bus.publish(query_key!["planItems"], EventKind::Invalidated);
        }

        let mut received = 0;
        while sub.try_next().is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
    }
}
