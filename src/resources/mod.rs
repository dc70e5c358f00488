//! Per-entity bindings over the sync context.
//!
//! Every dashboard resource is a collection at `root` with items at
//! `root + [id]`. [`create_resource_hooks`] builds the reads and the
//! create/update/delete/toggle mutations for one resource from its
//! [`Endpoints`]; the entity modules only declare keys and endpoints.
//!
//! | mutation | optimistic patch | invalidates |
//! | --- | --- | --- |
//! | create | none | collection |
//! | update | none | collection, item |
//! | delete | drop the record from collections | collection, item |
//! | toggle | flip the toggle field everywhere | collection, item |

mod caregivers;
mod diet;
mod documents;
mod hope_snippets;
mod journal;
mod patch;
mod plan_items;
mod research;

use std::fmt;
use std::marker::PhantomData;

use careboard_api_types::RecordId;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::cache::{CacheEntry, FetchOptions, FetchStatus, QueryKey};
use crate::context::SyncContext;
use crate::mutation::{MutationDescriptor, Optimistic};
use crate::transport::{ApiRequest, TransportError};

pub use caregivers::{CAREGIVERS, caregivers, caregivers_key};
pub use diet::{DIET_LOGS, diet_logs, diet_logs_key};
pub use documents::{DOCUMENTS, documents, documents_key};
pub use hope_snippets::{HOPE_SNIPPETS, hope_snippets, hope_snippets_key};
pub use journal::{JOURNAL_LOGS, journal_logs, journal_logs_key};
pub use patch::{flip_field, remove_by_id};
pub use plan_items::{PLAN_ITEMS, plan_items, plan_items_key};
pub use research::{SAVED_RESEARCH, saved_research, saved_research_key};

/// HTTP verb used for full-record updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateVerb {
    Put,
    Patch,
}

impl UpdateVerb {
    fn method(self) -> Method {
        match self {
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
        }
    }
}

/// A boolean flag flipped by `POST {collection}/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub action: &'static str,
    pub field: &'static str,
}

/// Where a resource lives on the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    /// Collection path relative to the API base URL.
    pub collection: &'static str,
    pub update: UpdateVerb,
    pub toggle: Option<Toggle>,
}

impl Endpoints {
    pub fn item(&self, id: RecordId) -> String {
        format!("{}/{id}", self.collection)
    }
}

/// Non-blocking view of one cached read.
///
/// `data` keeps the last good value while a refetch is loading or after it
/// failed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: FetchStatus,
    pub is_stale: bool,
    pub error: Option<TransportError>,
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn untracked() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            is_stale: true,
            error: None,
        }
    }
}

impl<T: DeserializeOwned> QueryState<T> {
    fn from_entry(entry: &CacheEntry) -> Self {
        let mut error = entry.error().cloned();
        let data = match entry.value().map(|v| decode::<T>(v.clone())) {
            Some(Ok(data)) => data,
            Some(Err(err)) => {
                error.get_or_insert(err);
                None
            }
            None => None,
        };
        Self {
            data,
            status: entry.status(),
            is_stale: entry.is_stale(),
            error,
        }
    }
}

/// Reads and writes for one resource type.
pub struct ResourceHooks<T> {
    ctx: SyncContext,
    root: QueryKey,
    endpoints: Endpoints,
    options: FetchOptions,
    _record: PhantomData<fn() -> T>,
}

/// Build the hooks for the resource cached under `root`.
pub fn create_resource_hooks<T>(
    ctx: &SyncContext,
    root: QueryKey,
    endpoints: Endpoints,
) -> ResourceHooks<T>
where
    T: DeserializeOwned,
{
    ResourceHooks {
        ctx: ctx.clone(),
        root,
        endpoints,
        options: FetchOptions::default(),
        _record: PhantomData,
    }
}

impl<T> Clone for ResourceHooks<T> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            root: self.root.clone(),
            endpoints: self.endpoints,
            options: self.options,
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResourceHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHooks")
            .field("root", &self.root)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl<T> ResourceHooks<T>
where
    T: DeserializeOwned,
{
    /// Freshness window for every read made through these hooks.
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn list_key(&self) -> QueryKey {
        self.root.clone()
    }

    pub fn item_key(&self, id: RecordId) -> QueryKey {
        self.root.child(id)
    }

    /// The whole collection. `Ok(None)` when the session expired and the
    /// policy returns empty.
    pub async fn list(&self) -> Result<Option<Vec<T>>, TransportError> {
        let value = self
            .ctx
            .query(&self.list_key(), self.list_request(), self.options)
            .await?;
        decode_some(value)
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<T>, TransportError> {
        let value = self
            .ctx
            .query(&self.item_key(id), self.item_request(id), self.options)
            .await?;
        decode_some(value)
    }

    /// Current state of the collection; revalidates in the background when
    /// missing or stale. Must be called within a tokio runtime.
    pub fn read_list(&self) -> QueryState<Vec<T>> {
        self.read_key(&self.list_key(), self.list_request())
    }

    /// Current state of one record; revalidates like [`Self::read_list`].
    pub fn read(&self, id: RecordId) -> QueryState<T> {
        self.read_key(&self.item_key(id), self.item_request(id))
    }

    pub async fn create<B>(&self, body: &B) -> Result<Option<T>, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(Method::POST, self.endpoints.collection).with_json(body)?;
        let descriptor = MutationDescriptor::new(request).invalidates(self.list_key());
        decode_some(self.ctx.mutate(descriptor).await?)
    }

    pub async fn update<B>(&self, id: RecordId, body: &B) -> Result<Option<T>, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let request = ApiRequest::new(self.endpoints.update.method(), self.endpoints.item(id))
            .with_json(body)?;
        let descriptor = MutationDescriptor::new(request)
            .invalidates(self.list_key())
            .invalidates(self.item_key(id));
        decode_some(self.ctx.mutate(descriptor).await?)
    }

    /// Returns `false` when the session expired and the policy returns empty.
    pub async fn delete(&self, id: RecordId) -> Result<bool, TransportError> {
        let request =
            ApiRequest::new(Method::DELETE, self.endpoints.item(id)).ignore_response();
        let descriptor = MutationDescriptor::new(request)
            .invalidates(self.list_key())
            .invalidates(self.item_key(id))
            .optimistic(Optimistic::new(move |_, current| remove_by_id(current, id)));
        Ok(self.ctx.mutate(descriptor).await?.is_some())
    }

    /// Flip the resource's toggle flag on record `id`.
    pub async fn toggle(&self, id: RecordId) -> Result<Option<T>, TransportError> {
        let Some(toggle) = self.endpoints.toggle else {
            return Err(TransportError::InvalidRequest(format!(
                "`{}` has no toggle action",
                self.endpoints.collection
            )));
        };

        let request = ApiRequest::new(
            Method::POST,
            format!("{}/{}", self.endpoints.item(id), toggle.action),
        );
        let descriptor = MutationDescriptor::new(request)
            .invalidates(self.list_key())
            .invalidates(self.item_key(id))
            .optimistic(Optimistic::new(move |_, current| {
                flip_field(current, id, toggle.field)
            }));
        decode_some(self.ctx.mutate(descriptor).await?)
    }

    fn list_request(&self) -> ApiRequest {
        ApiRequest::get(self.endpoints.collection)
    }

    fn item_request(&self, id: RecordId) -> ApiRequest {
        ApiRequest::get(self.endpoints.item(id))
    }

    fn read_key<D: DeserializeOwned>(&self, key: &QueryKey, request: ApiRequest) -> QueryState<D> {
        self.ctx.revalidate(key, request, self.options);
        match self.ctx.cache().peek(key) {
            Some(entry) => QueryState::from_entry(&entry),
            None => QueryState::untracked(),
        }
    }
}

/// `null` decodes to `None`.
fn decode<D: DeserializeOwned>(value: Value) -> Result<Option<D>, TransportError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value).map(Some).map_err(|err| {
        warn!(error = %err, "Response did not match the expected record shape");
        TransportError::decode(err)
    })
}

fn decode_some<D: DeserializeOwned>(value: Option<Value>) -> Result<Option<D>, TransportError> {
    match value {
        Some(value) => decode(value),
        None => Ok(None),
    }
}
