use careboard::SyncContext;
use careboard::resources::hope_snippets;
use careboard_api_types::{HopeSnippetCreateRequest, HopeSnippetUpdateRequest};

use crate::args::HopeSnippetsCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: HopeSnippetsCmd) -> Result<(), CliError> {
    let hooks = hope_snippets(ctx);
    match cmd {
        HopeSnippetsCmd::List => emit(ctx, hooks.list().await?),
        HopeSnippetsCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        HopeSnippetsCmd::Create { text, source } => {
            let body = HopeSnippetCreateRequest { text, source };
            emit(ctx, hooks.create(&body).await?)
        }
        HopeSnippetsCmd::Update { id, text, source } => {
            let body = HopeSnippetUpdateRequest { text, source };
            emit(ctx, hooks.update(id, &body).await?)
        }
        HopeSnippetsCmd::Favorite { id } => emit(ctx, hooks.toggle_favorite(id).await?),
        HopeSnippetsCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
