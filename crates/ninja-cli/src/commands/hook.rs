//! `hook`: run named hooks directly

use colored::Colorize;
use ninja_core::{CommandHookRunner, HookRunner, Settings};

use crate::error::{CliError, Result};

/// Key reported to hooks started from the command line.
const CLI_KEY: &str = "cli";

/// Run `names` in order, stopping at the first failure.
pub async fn run_hook(settings: &Settings, names: &[String]) -> Result<()> {
    let runner = CommandHookRunner::from_settings(settings);

    let unknown: Vec<String> = names
        .iter()
        .filter(|n| !runner.knows(n))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(CliError::UnknownHooks {
            unknown,
            available: runner.names().into_iter().map(str::to_string).collect(),
        });
    }

    for report in runner.run(CLI_KEY, names).await? {
        print!("{}", report.stdout);
        eprint!("{}", report.stderr);
        println!("{} {}", "ran".green().bold(), report.hook);
    }
    Ok(())
}
