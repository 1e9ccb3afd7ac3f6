//! replica CLI - clone a web page's visual design
//!
//! Entry point for the `replica` command-line interface. Each subcommand lives
//! in its own module under [`commands`].

use anyhow::{Context, Result};
use clap::Parser;
use replica_core::Config;

mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    execute_command(cli, config).await
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            Ok(config)
        },
        None => Config::load().context("loading configuration"),
    }
}

async fn execute_command(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Clone {
            url,
            output,
            options,
            timeout,
            json_events,
        } => {
            commands::clone_page(
                &config,
                commands::CloneArgs {
                    url,
                    output,
                    options,
                    timeout,
                    json_events,
                    quiet: cli.quiet,
                },
            )
            .await
        },
        Commands::Analyze {
            file,
            base_url,
            fingerprint_only,
        } => commands::analyze(&config, &file, &base_url, fingerprint_only),
        Commands::Prompt {
            file,
            base_url,
            json,
        } => commands::prompt(&config, &file, &base_url, json),
        Commands::Repair { file } => commands::repair(&file),
    }
}
