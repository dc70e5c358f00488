use careboard::SyncContext;
use careboard::resources::diet_logs;
use careboard_api_types::{DietLogCreateRequest, DietLogUpdateRequest};

use crate::args::DietCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: DietCmd) -> Result<(), CliError> {
    let hooks = diet_logs(ctx);
    match cmd {
        DietCmd::List => emit(ctx, hooks.list().await?),
        DietCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        DietCmd::Create {
            date,
            meal,
            description,
            calories,
            notes,
        } => {
            let body = DietLogCreateRequest {
                logged_on: date,
                meal_type: meal.into(),
                description,
                calories,
                notes,
            };
            emit(ctx, hooks.create(&body).await?)
        }
        DietCmd::Update {
            id,
            meal,
            description,
            calories,
            notes,
        } => {
            let body = DietLogUpdateRequest {
                meal_type: meal.map(Into::into),
                description,
                calories,
                notes,
            };
            emit(ctx, hooks.update(id, &body).await?)
        }
        DietCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
