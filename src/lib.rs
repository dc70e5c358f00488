//! careboard client synchronization layer.
//!
//! Every dashboard view reads and writes through one [`SyncContext`]:
//!
//! - [`transport`] attaches the bearer token and normalizes failures,
//! - [`cache`] de-duplicates and caches reads by [`QueryKey`],
//! - [`mutation`] runs writes and invalidates or patches affected keys,
//! - [`session`] decides what an expired session (HTTP 401) means,
//! - [`resources`] binds each dashboard entity to the pieces above.

pub mod cache;
pub mod config;
pub mod context;
pub mod infra;
pub mod mutation;
pub mod resources;
pub mod session;
pub mod transport;

pub use cache::{
    CacheConfig, CacheEntry, CacheEvent, EventKind, FetchOptions, FetchStatus, KeyToken,
    QueryKey, ResourceCache, Snapshot, Subscription,
};
pub use context::SyncContext;
pub use mutation::{MutationCoordinator, MutationDescriptor, Optimistic};
pub use resources::{Endpoints, QueryState, ResourceHooks, create_resource_hooks};
pub use session::{SessionPolicy, SessionState};
pub use transport::{ApiRequest, AuthenticatedTransport, ResponseBody, TransportError};
