use careboard_api_types::Caregiver;

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;

use super::{Endpoints, ResourceHooks, UpdateVerb, create_resource_hooks};

pub const CAREGIVERS: Endpoints = Endpoints {
    collection: "api/caregivers",
    update: UpdateVerb::Patch,
    toggle: None,
};

pub fn caregivers_key() -> QueryKey {
    query_key!["caregivers"]
}

/// Delegated caregivers and their permissions.
pub fn caregivers(ctx: &SyncContext) -> ResourceHooks<Caregiver> {
    create_resource_hooks(ctx, caregivers_key(), CAREGIVERS)
}
