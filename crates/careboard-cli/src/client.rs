use std::sync::Arc;

use careboard::SyncContext;
use careboard::config::{self, LoadError};
use careboard::infra::{InfraError, telemetry};
use careboard::session::{LoggingNavigator, SessionError};
use careboard::transport::TransportError;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("session store error: {0}")]
    Session(#[from] SessionError),
    #[error("session expired; run `careboard-cli session login`")]
    SessionExpired,
    #[error("input error: {0}")]
    Input(String),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Input(_) => 2,
            Self::SessionExpired | Self::Transport(TransportError::Unauthorized) => 3,
            _ => 1,
        }
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<SyncContext, CliError> {
    let settings = config::load(cli.config_file.as_deref(), &cli.overrides)?;
    telemetry::init(&settings.logging)?;
    let ctx = SyncContext::from_settings(&settings, Arc::new(LoggingNavigator))?;
    Ok(ctx)
}
