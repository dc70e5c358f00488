#![deny(clippy::all, clippy::pedantic)]

use std::process::ExitCode;

use clap::Parser;

mod args;
mod client;
mod handlers;
mod io;
mod print;


use args::Cli;
use client::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = client::build_ctx_from_cli(&cli)?;
    handlers::dispatch(&ctx, cli.command).await
}
