use careboard::SyncContext;
use careboard::resources::caregivers;
use careboard_api_types::{CaregiverInviteRequest, CaregiverUpdateRequest};

use crate::args::CaregiversCmd;
use crate::client::CliError;

use super::{emit, emit_deleted};

pub async fn handle(ctx: &SyncContext, cmd: CaregiversCmd) -> Result<(), CliError> {
    let hooks = caregivers(ctx);
    match cmd {
        CaregiversCmd::List => emit(ctx, hooks.list().await?),
        CaregiversCmd::Get { id } => emit(ctx, hooks.get(id).await?),
        CaregiversCmd::Invite { email, permissions } => {
            let body = CaregiverInviteRequest {
                email,
                permissions: permissions.into(),
            };
            emit(ctx, hooks.create(&body).await?)
        }
        CaregiversCmd::Update { id, permissions } => {
            let body = CaregiverUpdateRequest {
                permissions: permissions.into(),
            };
            emit(ctx, hooks.update(id, &body).await?)
        }
        CaregiversCmd::Delete { id } => emit_deleted(id, hooks.delete(id).await?),
    }
}
