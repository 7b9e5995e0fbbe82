use std::process::ExitCode;

use bulker_observe::{LoggerConfig, logger_init};
use clap::Parser;
use tracing::error;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_cfg = match LoggerConfig::resolve(cli.log_level.as_deref(), cli.log_format.as_deref())
    {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("bulker: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger_init(&log_cfg) {
        eprintln!("bulker: {e}");
        return ExitCode::FAILURE;
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Command::Run(args) => commands::run(args, config).await,
        Command::List => commands::list(config),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
