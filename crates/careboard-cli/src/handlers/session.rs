use careboard::SyncContext;
use careboard_api_types::LoginRequest;
use serde_json::json;

use crate::args::SessionCmd;
use crate::client::CliError;
use crate::io::read_secret;
use crate::print::print_json;

pub async fn handle(ctx: &SyncContext, cmd: SessionCmd) -> Result<(), CliError> {
    match cmd {
        SessionCmd::Login {
            email,
            password,
            password_file,
        } => {
            let password = match (password, password_file) {
                (_, Some(path)) => read_secret(&path).await?,
                (Some(password), None) => password,
                (None, None) => {
                    return Err(CliError::Input(
                        "a password is required (--password, --password-file or CAREBOARD_PASSWORD)"
                            .into(),
                    ));
                }
            };
            let response = ctx.sign_in(&LoginRequest { email, password }).await?;
            print_json(&json!({ "signed_in": true, "user": response.user }))
        }
        SessionCmd::Logout => {
            ctx.logout()?;
            print_json(&json!({ "signed_in": false }))
        }
        SessionCmd::Status => {
            let session = ctx.session();
            print_json(&json!({
                "signed_in": session.is_authenticated(),
                "policy": session.policy().to_string(),
            }))
        }
    }
}
