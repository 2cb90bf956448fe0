mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use orx_core::OrxError;
use orx_observe::{LoggerConfig, logger_init};
use tracing::debug;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1) Logger
    let cfg = LoggerConfig {
        format: cli.log_format,
        level: cli.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = logger_init(&cfg) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    debug!(level = %cfg.level, "logger initialized");

    // 2) Command
    match commands::dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Rejected input exits with 2, every other failure with 1.
fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<OrxError>()
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(1)
}
