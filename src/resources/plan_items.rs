use careboard_api_types::{PlanItem, RecordId};

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;
use crate::transport::TransportError;

use super::{Endpoints, ResourceHooks, Toggle, UpdateVerb, create_resource_hooks};

pub const PLAN_ITEMS: Endpoints = Endpoints {
    collection: "api/plan-items",
    update: UpdateVerb::Put,
    toggle: Some(Toggle {
        action: "toggle",
        field: "completed",
    }),
};

pub fn plan_items_key() -> QueryKey {
    query_key!["planItems"]
}

/// Treatment plan steps.
pub fn plan_items(ctx: &SyncContext) -> ResourceHooks<PlanItem> {
    create_resource_hooks(ctx, plan_items_key(), PLAN_ITEMS)
}

impl ResourceHooks<PlanItem> {
    /// Mark a step done or not done; every cached view flips immediately.
    pub async fn toggle_completion(&self, id: RecordId) -> Result<Option<PlanItem>, TransportError> {
        self.toggle(id).await
    }
}
