//! tracing-subscriber setup
//!
//! Filter precedence: `RUST_LOG`, then `--verbose`, then the settings
//! `CONFIG_NINJA_LOGGING.level`, then `info`. `CONFIG_NINJA_LOGGING.filter`
//! appends extra directives.

use ninja_core::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Build the filter directives used when `RUST_LOG` is unset.
pub fn directives(verbose: bool, settings: Option<&LoggingSettings>) -> String {
    let level = if verbose {
        "debug"
    } else {
        settings
            .and_then(|s| s.level.as_deref())
            .unwrap_or("info")
    };

    match settings.and_then(|s| s.filter.as_deref()) {
        Some(extra) if !extra.trim().is_empty() => format!("{level},{extra}"),
        _ => level.to_string(),
    }
}

/// Install the global subscriber, logging to stderr.
pub fn init(verbose: bool, settings: Option<&LoggingSettings>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = directives(verbose, settings);
        EnvFilter::try_new(&directives).unwrap_or_else(|e| {
            eprintln!("invalid log filter '{directives}': {e}");
            EnvFilter::new("info")
        })
    });

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_ok() {
        tracing::debug!("Logging initialised");
    }
}
