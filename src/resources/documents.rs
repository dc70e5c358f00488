use careboard_api_types::Document;

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;

use super::{Endpoints, ResourceHooks, UpdateVerb, create_resource_hooks};

pub const DOCUMENTS: Endpoints = Endpoints {
    collection: "api/documents",
    update: UpdateVerb::Patch,
    toggle: None,
};

pub fn documents_key() -> QueryKey {
    query_key!["documents"]
}

/// Uploaded document metadata. Updates send only the changed fields.
pub fn documents(ctx: &SyncContext) -> ResourceHooks<Document> {
    create_resource_hooks(ctx, documents_key(), DOCUMENTS)
}
