use careboard::SyncContext;
use careboard::resources::journal_logs;
use careboard_api_types::{JournalLogCreateRequest, JournalLogUpdateRequest};

use crate::args::{JournalCmd, JournalFields};
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: JournalCmd) -> Result<(), CliError> {
    let hooks = journal_logs(ctx);
    match cmd {
        JournalCmd::List => emit(ctx, hooks.list().await?),
        JournalCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        JournalCmd::Create { date, fields } => {
            let JournalFields {
                mood,
                pain_level,
                energy_level,
                notes,
            } = fields;
            let body = JournalLogCreateRequest {
                entry_date: date,
                mood,
                pain_level,
                energy_level,
                notes,
            };
            emit(ctx, hooks.create(&body).await?)
        }
        JournalCmd::Update { id, fields } => {
            let body = JournalLogUpdateRequest {
                mood: fields.mood,
                pain_level: fields.pain_level,
                energy_level: fields.energy_level,
                notes: fields.notes,
            };
            emit(ctx, hooks.update(id, &body).await?)
        }
        JournalCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
