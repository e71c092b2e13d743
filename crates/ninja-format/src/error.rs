//! Error types for ninja-format

use std::fmt;
use std::path::PathBuf;

use crate::Format;

/// Result type for ninja-format operations
pub type Result<T> = std::result::Result<T, Error>;

/// Location of a decode failure inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line number
    pub line: Option<usize>,
    /// 1-based column number
    pub column: Option<usize>,
    /// 0-based byte offset
    pub offset: Option<usize>,
}

impl Position {
    pub fn line_column(line: usize, column: usize) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            offset: None,
        }
    }

    /// Build a position from a byte offset, deriving line and column.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        Self {
            line: Some(line),
            column: Some(offset - line_start + 1),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column, self.offset) {
            (Some(line), Some(column), _) => write!(f, "line {line}, column {column}"),
            (Some(line), None, _) => write!(f, "line {line}"),
            (None, _, Some(offset)) => write!(f, "byte {offset}"),
            _ => write!(f, "unknown position"),
        }
    }
}

fn at(position: &Option<Position>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

/// Errors that can occur in ninja-format operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown format '{tag}' (expected one of: {})", Format::TAGS.join(", "))]
    UnknownFormat { tag: String },

    #[error("Failed to decode {format} content{}: {message}", at(.position))]
    Decode {
        format: Format,
        message: String,
        position: Option<Position>,
    },

    #[error("Cannot encode value as {format}: {message}")]
    Encode { format: Format, message: String },

    #[error("Failed to load template {path}: {message}")]
    TemplateLoad { path: PathBuf, message: String },

    #[error("Failed to render template {template}: {message}")]
    TemplateRender {
        template: String,
        /// The undefined reference that stopped rendering, when known
        missing: Option<String>,
        message: String,
    },
}

impl Error {
    pub fn decode(format: Format, message: impl Into<String>, position: Option<Position>) -> Self {
        Self::Decode {
            format,
            message: message.into(),
            position,
        }
    }

    pub fn encode(format: Format, message: impl Into<String>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }
}
