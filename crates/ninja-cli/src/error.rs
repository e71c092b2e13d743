//! Error types for ninja-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a CLI invocation with a non-zero exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings, validation or backend construction failed
    #[error(transparent)]
    Core(#[from] ninja_core::Error),

    #[error("Cannot start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// One-shot apply finished with failed objects
    #[error("{failed} of {total} object(s) failed")]
    ObjectsFailed { failed: usize, total: usize },

    /// Every monitor loop ended in `Failed` before cancellation
    #[error("every monitored object failed")]
    MonitorFailed,

    #[error("Unknown hook(s): {} (available: {})", .unknown.join(", "), .available.join(", "))]
    UnknownHooks {
        unknown: Vec<String>,
        available: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hooks_lists_available() {
        let err = CliError::UnknownHooks {
            unknown: vec!["nope".into()],
            available: vec!["reload".into(), "restart".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown hook(s): nope (available: reload, restart)"
        );
    }
}
