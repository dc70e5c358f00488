//! Write coordination.
//!
//! A [`MutationDescriptor`] states what to send and which cached reads the
//! write affects. [`MutationCoordinator::mutate`] sends it and then keeps the
//! cache consistent: affected prefixes are invalidated on success, and
//! optimistic patches are reverted on failure.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::cache::{QueryKey, ResourceCache, Snapshot};
use crate::transport::{ApiRequest, AuthenticatedTransport, TransportError};

const METRIC_MUTATION: &str = "careboard_mutation_total";
const METRIC_MUTATION_ROLLBACK: &str = "careboard_mutation_rollback_total";

/// Maps the current value of one cached key to its replacement.
pub type Patcher = Arc<dyn Fn(&QueryKey, Option<Value>) -> Option<Value> + Send + Sync>;

/// Cache edits applied before the server confirms a write.
#[derive(Clone)]
pub struct Optimistic {
    patch: Patcher,
    rollback: Option<Patcher>,
}

impl Optimistic {
    /// Patch applied to every tracked entry under the declared prefixes.
    pub fn new<P>(patch: P) -> Self
    where
        P: Fn(&QueryKey, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            patch: Arc::new(patch),
            rollback: None,
        }
    }

    /// Compute the restored value from the pre-patch snapshot instead of
    /// restoring the snapshot verbatim.
    pub fn with_rollback<R>(mut self, rollback: R) -> Self
    where
        R: Fn(&QueryKey, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.rollback = Some(Arc::new(rollback));
        self
    }

    fn restored(&self, key: &QueryKey, snapshot: Option<Value>) -> Option<Value> {
        match &self.rollback {
            Some(rollback) => rollback(key, snapshot),
            None => snapshot,
        }
    }
}

impl fmt::Debug for Optimistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimistic")
            .field("custom_rollback", &self.rollback.is_some())
            .finish_non_exhaustive()
    }
}

/// One write plus the cache keys it affects.
#[derive(Debug, Clone)]
pub struct MutationDescriptor {
    pub request: ApiRequest,
    /// Keys or prefixes marked stale once the write succeeds. Also the scope
    /// of the optimistic patch.
    pub invalidates: Vec<QueryKey>,
    pub optimistic: Option<Optimistic>,
}

impl MutationDescriptor {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            invalidates: Vec::new(),
            optimistic: None,
        }
    }

    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidates.push(key);
        self
    }

    pub fn optimistic(mut self, optimistic: Optimistic) -> Self {
        self.optimistic = Some(optimistic);
        self
    }
}

/// Executes writes and applies their cache side effects.
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    transport: Arc<AuthenticatedTransport>,
    cache: ResourceCache,
}

impl MutationCoordinator {
    pub fn new(transport: Arc<AuthenticatedTransport>, cache: ResourceCache) -> Self {
        Self { transport, cache }
    }

    /// Send the write and reconcile the cache.
    ///
    /// On success every declared prefix is invalidated and the response body
    /// is returned. On failure every optimistically patched key is restored
    /// before the error is returned. `Ok(None)` means the session expired and
    /// the session policy swallows the error.
    pub async fn mutate(
        &self,
        descriptor: MutationDescriptor,
    ) -> Result<Option<Value>, TransportError> {
        let mutation_id = Uuid::new_v4();
        let span = info_span!(
            "mutation",
            %mutation_id,
            method = %descriptor.request.method,
            path = %descriptor.request.path,
        );
        self.run(descriptor).instrument(span).await
    }

    async fn run(&self, descriptor: MutationDescriptor) -> Result<Option<Value>, TransportError> {
        let MutationDescriptor {
            request,
            invalidates,
            optimistic,
        } = descriptor;

        let snapshots = match &optimistic {
            Some(rule) => self.apply_patch(&invalidates, rule),
            None => Vec::new(),
        };

        match self.transport.send_request(&request).await {
            Ok(value) => {
                counter!(METRIC_MUTATION, "outcome" => "success").increment(1);
                let mut marked = 0;
                for prefix in &invalidates {
                    marked += self.cache.invalidate(prefix);
                }
                debug!(marked, "Mutation confirmed");
                Ok(Some(value))
            }
            Err(err) => {
                counter!(METRIC_MUTATION, "outcome" => "failure").increment(1);
                if let Some(rule) = &optimistic {
                    self.revert(snapshots, rule);
                }
                warn!(error = %err, "Mutation failed");
                self.transport.session().settle(Err(err))
            }
        }
    }

    fn apply_patch(&self, prefixes: &[QueryKey], rule: &Optimistic) -> Vec<(QueryKey, Snapshot)> {
        let keys: BTreeSet<QueryKey> = prefixes
            .iter()
            .flat_map(|prefix| self.cache.keys_matching(prefix))
            .collect();

        keys.into_iter()
            .map(|key| {
                let snapshot = self
                    .cache
                    .set_optimistic(&key, |current| (rule.patch)(&key, current));
                (key, snapshot)
            })
            .collect()
    }

    /// Keys refetched while the write was in flight keep the server value and
    /// are invalidated instead of restored.
    fn revert(&self, snapshots: Vec<(QueryKey, Snapshot)>, rule: &Optimistic) {
        if snapshots.is_empty() {
            return;
        }
        counter!(METRIC_MUTATION_ROLLBACK).increment(1);
        let total = snapshots.len();
        let mut restored = 0;
        for (key, snapshot) in snapshots {
            let value = rule.restored(&key, snapshot.value().cloned());
            if self.cache.rollback(&key, snapshot.with_value(value)) {
                restored += 1;
            }
        }
        debug!(total, restored, "Optimistic patch reverted");
    }
}
