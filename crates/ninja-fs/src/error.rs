//! Error types for ninja-fs

use std::path::PathBuf;

/// Result type for ninja-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ninja-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied writing {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path has no file name: {path}")]
    InvalidPath { path: PathBuf },
}

impl Error {
    /// Wrap an I/O error, classifying permission failures separately.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path, source }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether the failure was caused by missing permissions.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}
