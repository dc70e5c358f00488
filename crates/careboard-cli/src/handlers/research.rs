use careboard::SyncContext;
use careboard::resources::saved_research;
use careboard_api_types::SaveResearchRequest;

use crate::args::ResearchCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: ResearchCmd) -> Result<(), CliError> {
    let hooks = saved_research(ctx);
    match cmd {
        ResearchCmd::List => emit(ctx, hooks.list().await?),
        ResearchCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        ResearchCmd::Save {
            title,
            url,
            summary,
        } => {
            let body = SaveResearchRequest {
                title,
                url,
                summary,
            };
            emit(ctx, hooks.create(&body).await?)
        }
        ResearchCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
