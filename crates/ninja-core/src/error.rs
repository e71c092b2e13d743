//! Error types for ninja-core

use std::path::PathBuf;

/// Result type for ninja-core operations
pub type Result<T> = std::result::Result<T, Error>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur in ninja-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No settings file was found in any search location
    #[error("Settings file not found (searched: {})", join_paths(.searched))]
    SettingsNotFound { searched: Vec<PathBuf> },

    /// The settings file exists but could not be read
    #[error("Failed to read settings file {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be parsed
    #[error("Invalid settings file {path}: {message}")]
    SettingsParse { path: PathBuf, message: String },

    /// An object definition is invalid
    #[error("Configuration error for '{key}': {message}")]
    Configuration { key: String, message: String },

    /// Several object definitions are invalid
    #[error("Invalid configuration:\n  {}", .problems.join("\n  "))]
    Validation { problems: Vec<String> },

    /// A requested object key is not configured
    #[error("Unknown object '{key}' (available: {})", .available.join(", "))]
    UnknownObject { key: String, available: Vec<String> },

    /// A hook exited unsuccessfully or could not be started
    #[error("Hook '{hook}' failed for '{key}': {message}")]
    Hook {
        key: String,
        hook: String,
        message: String,
    },

    /// A per-object task ended abnormally
    #[error("Task for '{key}' ended abnormally: {message}")]
    Task { key: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Backend error from ninja-backend
    #[error(transparent)]
    Backend(#[from] ninja_backend::Error),

    /// Format or template error from ninja-format
    #[error(transparent)]
    Format(#[from] ninja_format::Error),

    /// Filesystem error from ninja-fs
    #[error(transparent)]
    Fs(#[from] ninja_fs::Error),
}

impl Error {
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from invalid configuration, which must be
    /// fixed before anything can run.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::SettingsNotFound { .. }
            | Self::SettingsRead { .. }
            | Self::SettingsParse { .. }
            | Self::Configuration { .. }
            | Self::Validation { .. }
            | Self::UnknownObject { .. } => true,
            Self::Backend(e) => e.is_configuration(),
            Self::Format(e) => matches!(
                e,
                ninja_format::Error::UnknownFormat { .. } | ninja_format::Error::TemplateLoad { .. }
            ),
            _ => false,
        }
    }

    /// Whether this error ends the object loop that hit it.
    ///
    /// Hook failures are reported but leave the loop running.
    pub fn is_fatal_for_object(&self) -> bool {
        !matches!(self, Self::Hook { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_not_found_lists_paths() {
        let err = Error::SettingsNotFound {
            searched: vec![PathBuf::from("a.yaml"), PathBuf::from("/etc/b.yaml")],
        };
        assert_eq!(
            err.to_string(),
            "Settings file not found (searched: a.yaml, /etc/b.yaml)"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn hook_failure_is_not_fatal() {
        let err = Error::Hook {
            key: "app".into(),
            hook: "reload".into(),
            message: "exit code 1".into(),
        };
        assert!(!err.is_fatal_for_object());
        assert!(!err.is_configuration());
    }

    #[test]
    fn unknown_backend_is_configuration() {
        let err = Error::from(ninja_backend::Error::UnknownBackend {
            kind: "vault".into(),
            available: vec!["local".into()],
        });
        assert!(err.is_configuration());
    }

    #[test]
    fn validation_lists_problems() {
        let err = Error::Validation {
            problems: vec!["a: bad".into(), "b: worse".into()],
        };
        assert_eq!(err.to_string(), "Invalid configuration:\n  a: bad\n  b: worse");
    }
}
