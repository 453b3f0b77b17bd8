//! reqmerge CLI - merge and sync request collections from the terminal
//!
//! Offline three-way merges of collection files, plus pull/push against a
//! directory-backed remote with interactive conflict resolution.

mod cli;
mod commands;
mod config;
mod error;
mod resolver;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::merge::run_merge;
use crate::commands::publish::run_publish;
use crate::commands::pull::run_pull;
use crate::commands::push::run_push;
use crate::commands::resolve::run_resolve;
use crate::config::CliConfig;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "reqmerge=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive: Directive = DEFAULT_LOG_DIRECTIVE
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Merge {
            base,
            local,
            remote,
            json,
            output,
        } => run_merge(&base, &local, &remote, json, output.as_deref())?,
        Commands::Resolve {
            result,
            resolutions,
            output,
        } => {
            let config = CliConfig::load(config_path)?;
            run_resolve(&result, &resolutions, output.as_deref(), &config.sync)?;
        }
        Commands::Pull { collection, local } => {
            let settings = CliConfig::load(config_path)?.remote_settings(cli.remote_dir, cli.workspace)?;
            run_pull(&settings, &collection, &local).await?;
        }
        Commands::Push {
            collection,
            local,
            prefer,
        } => {
            let settings = CliConfig::load(config_path)?.remote_settings(cli.remote_dir, cli.workspace)?;
            run_push(&settings, &collection, &local, prefer).await?;
        }
        Commands::Publish { collection, local } => {
            let settings = CliConfig::load(config_path)?.remote_settings(cli.remote_dir, cli.workspace)?;
            run_publish(&settings, &collection, &local).await?;
        }
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
        Commands::Config { command } => {
            run_config(command, config_path, cli.remote_dir, cli.workspace)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
