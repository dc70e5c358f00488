use careboard::SyncContext;
use careboard::resources::documents;
use careboard_api_types::{DocumentCreateRequest, DocumentUpdateRequest};

use crate::args::DocumentsCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: DocumentsCmd) -> Result<(), CliError> {
    let hooks = documents(ctx);
    match cmd {
        DocumentsCmd::List => emit(ctx, hooks.list().await?),
        DocumentsCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        DocumentsCmd::Create {
            title,
            file_name,
            content_type,
        } => {
            let body = DocumentCreateRequest {
                title,
                file_name,
                content_type,
            };
            emit(ctx, hooks.create(&body).await?)
        }
        DocumentsCmd::Rename { id, title } => {
            let body = DocumentUpdateRequest { title: Some(title) };
            emit(ctx, hooks.update(id, &body).await?)
        }
        DocumentsCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
