use careboard_api_types::JournalLog;

use crate::cache::QueryKey;
use crate::context::SyncContext;
use crate::query_key;

use super::{Endpoints, ResourceHooks, UpdateVerb, create_resource_hooks};

pub const JOURNAL_LOGS: Endpoints = Endpoints {
    collection: "api/journal",
    update: UpdateVerb::Put,
    toggle: None,
};

pub fn journal_logs_key() -> QueryKey {
    query_key!["journalLogs"]
}

/// Daily mood, pain and energy entries.
pub fn journal_logs(ctx: &SyncContext) -> ResourceHooks<JournalLog> {
    create_resource_hooks(ctx, journal_logs_key(), JOURNAL_LOGS)
}
