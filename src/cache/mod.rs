//! Query cache.
//!
//! An in-memory map from [`QueryKey`] to the last known value of a remote
//! resource, with per-key request de-duplication, prefix invalidation,
//! optimistic updates and change notifications.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! default_stale_after_seconds = 300  # omit to only refetch after invalidation
//! event_capacity = 256
//! ```

mod config;
mod entry;
mod events;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use entry::{CacheEntry, FetchStatus};
pub use events::{CacheEvent, Epoch, EventKind, Subscription};
pub use keys::{KeyToken, QueryKey};
pub use store::{FetchOptions, FetchResult, ResourceCache, Snapshot, is_serving_previous};
