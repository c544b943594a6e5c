use anyhow::Result;
use clap::Parser;
use mvnload_core::{MvnloadConfig, console};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let config = MvnloadConfig::from_env();

    if let Err(error) = init_tracing(args.verbose || config.verbose) {
        eprintln!("failed to initialise logging: {error}");
    }

    let token = CancellationToken::new();
    let watcher = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    match run(args.command, &config, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            console::error(&format!("{error:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &MvnloadConfig, token: CancellationToken) -> Result<()> {
    match command {
        Command::Resolve(args) => commands::resolve::run(args, config, token).await,
        Command::Fetch(args) => commands::fetch::run(args, config, token).await,
        Command::Run(args) => commands::run::run(args, config, token).await,
        Command::Config(args) => commands::config::run(args, config).await,
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    Ok(())
}
