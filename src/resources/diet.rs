use careboard_api_types::DietLog;

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;

use super::{Endpoints, ResourceHooks, UpdateVerb, create_resource_hooks};

pub const DIET_LOGS: Endpoints = Endpoints {
    collection: "api/diet-logs",
    update: UpdateVerb::Put,
    toggle: None,
};

pub fn diet_logs_key() -> QueryKey {
    query_key!["dietLogs"]
}

pub fn diet_logs(ctx: &SyncContext) -> ResourceHooks<DietLog> {
    create_resource_hooks(ctx, diet_logs_key(), DIET_LOGS)
}
