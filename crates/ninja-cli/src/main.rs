//! config-ninja CLI
//!
//! Keeps local configuration files in sync with their sources.

mod cli;
mod commands;
mod error;
mod logging;
mod signal;

use clap::Parser;
use colored::Colorize;
use ninja_core::Settings;

use cli::{Cli, Commands, SelfAction};
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::discover(cli.config.as_deref())?;
    logging::init(cli.verbose, Some(settings.logging()));
    tracing::debug!(path = %settings.path().display(), "Using settings");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(execute_command(cli.command, settings))
}

async fn execute_command(cmd: Commands, settings: Settings) -> Result<()> {
    match cmd {
        Commands::Get { keys, poll } => {
            commands::run_get(&commands::engine(&settings)?, &keys, poll).await
        }
        Commands::Apply { keys, poll } => {
            commands::run_apply(&commands::engine(&settings)?, &keys, poll).await
        }
        Commands::Monitor { keys } => {
            commands::run_monitor(&commands::engine(&settings)?, &keys).await
        }
        Commands::Hook { names } => commands::run_hook(&settings, &names).await,
        Commands::Itself {
            action: SelfAction::Print,
        } => commands::run_print(&settings),
    }
}
