use careboard_api_types::SavedResearch;

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;

use super::{Endpoints, ResourceHooks, UpdateVerb, create_resource_hooks};

pub const SAVED_RESEARCH: Endpoints = Endpoints {
    collection: "api/research/saved",
    update: UpdateVerb::Put,
    toggle: None,
};

pub fn saved_research_key() -> QueryKey {
    query_key!["research", "saved"]
}

/// Articles the user bookmarked. Nested under `["research"]` so invalidating
/// that prefix also drops any other research views.
pub fn saved_research(ctx: &SyncContext) -> ResourceHooks<SavedResearch> {
    create_resource_hooks(ctx, saved_research_key(), SAVED_RESEARCH)
}
