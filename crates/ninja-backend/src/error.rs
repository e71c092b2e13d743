//! Error types for ninja-backend

use std::path::PathBuf;

/// Result type for ninja-backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or reading a backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No factory is registered under the requested tag
    #[error("Unknown backend '{kind}' (available: {})", .available.join(", "))]
    UnknownBackend { kind: String, available: Vec<String> },

    /// Construction parameters are missing or malformed
    #[error("Invalid parameters for {backend} backend: {message}")]
    InvalidParams { backend: String, message: String },

    /// The source could not be reached
    #[error("Source unavailable ({backend}): {message}")]
    Unavailable { backend: String, message: String },

    /// The referenced object does not exist
    #[error("Source not found ({backend}): {message}")]
    NotFound { backend: String, message: String },

    /// A friendly name could not be resolved to an identifier
    #[error("Could not resolve {kind} named '{name}': {message}")]
    Resolution {
        kind: String,
        name: String,
        message: String,
    },

    /// Transient failures persisted past the retry budget
    #[error("Giving up on {backend} after {attempts} consecutive failures: {message}")]
    RetriesExhausted {
        backend: String,
        attempts: u32,
        message: String,
    },

    /// A filesystem watch could not be established
    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },
}

impl Error {
    pub fn invalid_params(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn not_found(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from invalid configuration rather than the
    /// state of the source.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownBackend { .. } | Self::InvalidParams { .. })
    }
}
