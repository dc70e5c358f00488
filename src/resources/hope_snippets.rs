use careboard_api_types::{HopeSnippet, RecordId};

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;
use crate::transport::TransportError;

use super::{Endpoints, ResourceHooks, Toggle, UpdateVerb, create_resource_hooks};

pub const HOPE_SNIPPETS: Endpoints = Endpoints {
    collection: "api/hope-snippets",
    update: UpdateVerb::Put,
    toggle: Some(Toggle {
        action: "favorite",
        field: "favorite",
    }),
};

pub fn hope_snippets_key() -> QueryKey {
    query_key!["hopeSnippets"]
}

pub fn hope_snippets(ctx: &SyncContext) -> ResourceHooks<HopeSnippet> {
    create_resource_hooks(ctx, hope_snippets_key(), HOPE_SNIPPETS)
}

impl ResourceHooks<HopeSnippet> {
    pub async fn toggle_favorite(&self, id: RecordId) -> Result<Option<HopeSnippet>, TransportError> {
        self.toggle(id).await
    }
}
