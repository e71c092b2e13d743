//! `monitor` and `apply --poll`: apply changes until interrupted

use std::sync::Arc;

use colored::Colorize;
use ninja_core::{MonitorReport, SyncEngine, WriteOutcome};

use crate::error::{CliError, Result};
use crate::signal::shutdown_token;

/// Run the monitor over `keys` until SIGINT or SIGTERM.
pub async fn run_monitor(engine: &SyncEngine, keys: &[String]) -> Result<()> {
    let report = engine
        .monitor(
            keys,
            shutdown_token(),
            Arc::new(|key: &str, outcome: WriteOutcome| {
                if outcome == WriteOutcome::Written {
                    println!("{} {}", "written".green().bold(), key);
                }
            }),
        )
        .await?;
    finish(&report)
}

/// Exit status of a finished monitor: failure only when every loop failed.
pub fn finish(report: &MonitorReport) -> Result<()> {
    for outcome in report.failed() {
        if let Some(e) = &outcome.error {
            eprintln!("{} {}: {}", "failed".red().bold(), outcome.key, e);
        }
    }

    if report.all_failed() {
        Err(CliError::MonitorFailed)
    } else {
        Ok(())
    }
}
