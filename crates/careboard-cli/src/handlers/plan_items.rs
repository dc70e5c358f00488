use careboard::SyncContext;
use careboard::resources::plan_items;
use careboard_api_types::{PlanItemCreateRequest, PlanItemUpdateRequest};

use crate::args::PlanItemsCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: PlanItemsCmd) -> Result<(), CliError> {
    let hooks = plan_items(ctx);
    match cmd {
        PlanItemsCmd::List => emit(ctx, hooks.list().await?),
        PlanItemsCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        PlanItemsCmd::Create {
            title,
            notes,
            category,
            due_at,
        } => {
            let body = PlanItemCreateRequest {
                title,
                notes,
                category,
                due_at,
            };
            emit(ctx, hooks.create(&body).await?)
        }
        PlanItemsCmd::Update {
            id,
            title,
            notes,
            category,
            due_at,
        } => {
            let body = PlanItemUpdateRequest {
                title,
                notes,
                category,
                due_at,
            };
            emit(ctx, hooks.update(id, &body).await?)
        }
        PlanItemsCmd::Toggle { id } => emit(ctx, hooks.toggle_completion(id).await?),
        PlanItemsCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
