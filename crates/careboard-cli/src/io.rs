use std::path::Path;

use crate::client::CliError;

/// Read a secret from a file, dropping the trailing newline.
pub async fn read_secret(path: &Path) -> Result<String, CliError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let secret = raw.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        return Err(CliError::Input(format!("{} is empty", path.display())));
    }
    Ok(secret)
}
