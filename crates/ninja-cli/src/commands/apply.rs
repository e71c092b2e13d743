//! `apply`: write objects to their destinations

use colored::Colorize;
use ninja_core::{SyncEngine, WriteOutcome};

use crate::commands::monitor::run_monitor;
use crate::error::{CliError, Result};

/// Apply `keys` once, or keep applying with `poll`.
pub async fn run_apply(engine: &SyncEngine, keys: &[String], poll: bool) -> Result<()> {
    if poll {
        return run_monitor(engine, keys).await;
    }

    let report = engine.apply(keys).await?;
    for entry in &report.entries {
        match &entry.result {
            Ok(WriteOutcome::Written) => {
                println!("{} {}", "written".green().bold(), entry.key)
            }
            Ok(WriteOutcome::Unchanged) => {
                println!("{} {}", "unchanged".dimmed(), entry.key)
            }
            Err(e) => println!("{} {}: {}", "failed".red().bold(), entry.key, e),
        }
        if let Some(e) = &entry.hook_error {
            println!("  {} {}", "hook failed:".yellow().bold(), e);
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::ObjectsFailed {
            failed: report.failures().count(),
            total: report.entries.len(),
        })
    }
}
