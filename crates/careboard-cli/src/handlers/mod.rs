use careboard::SyncContext;
use careboard_api_types::RecordId;
use serde::Serialize;
use serde_json::json;

use crate::args::Commands;
use crate::client::CliError;
use crate::print::print_json;

mod caregivers;
mod diet;
mod documents;
mod hope_snippets;
mod journal;
mod plan_items;
mod research;
mod session;

pub async fn dispatch(ctx: &SyncContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Session(cmd) => session::handle(ctx, cmd).await,
        Commands::PlanItems(cmd) => plan_items::handle(ctx, cmd).await,
        Commands::Journal(cmd) => journal::handle(ctx, cmd).await,
        Commands::Diet(cmd) => diet::handle(ctx, cmd).await,
        Commands::Documents(cmd) => documents::handle(ctx, cmd).await,
        Commands::HopeSnippets(cmd) => hope_snippets::handle(ctx, cmd).await,
        Commands::Research(cmd) => research::handle(ctx, cmd).await,
        Commands::Caregivers(cmd) => caregivers::handle(ctx, cmd).await,
    }
}

/// Print a hook result. `None` from an expired session is an error; any other
/// `None` is an empty response body.
pub(crate) fn emit<T: Serialize>(ctx: &SyncContext, value: Option<T>) -> Result<(), CliError> {
    match value {
        Some(value) => print_json(&value),
        None if ctx.session().is_expired() => Err(CliError::SessionExpired),
        None => print_json(&serde_json::Value::Null),
    }
}

pub(crate) fn emit_deleted(id: RecordId, deleted: bool) -> Result<(), CliError> {
    if !deleted {
        return Err(CliError::SessionExpired);
    }
    print_json(&json!({ "deleted": id }))
}
