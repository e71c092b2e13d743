//! `self print`: show the configured objects

use colored::Colorize;
use ninja_core::Settings;

use crate::error::Result;

/// Print the settings path and the configured objects as YAML.
pub fn run_print(settings: &Settings) -> Result<()> {
    println!(
        "{}",
        format!("# {}", settings.path().display()).dimmed()
    );
    print!("{}", settings.objects_yaml()?);
    Ok(())
}
