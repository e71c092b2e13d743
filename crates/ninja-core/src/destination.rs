//! Conditional, atomic writes of rendered values

use std::fmt;
use std::path::{Path, PathBuf};

use ninja_format::{Output, Value};

use crate::error::Result;

/// Result of applying a value to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was (re)written
    Written,
    /// The file already held the rendered bytes
    Unchanged,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written => write!(f, "written"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A target file and the strategy used to render it.
#[derive(Debug)]
pub struct Destination {
    path: PathBuf,
    output: Output,
}

impl Destination {
    pub fn new(path: impl Into<PathBuf>, output: Output) -> Self {
        Self {
            path: path.into(),
            output,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Render `value` into destination bytes.
    pub fn render(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(self.output.render(value)?.into_bytes())
    }

    /// Write the rendered value if it differs from the file on disk.
    ///
    /// The current file is re-read on every call, so external edits are
    /// detected and overwritten. A missing file counts as different.
    pub fn apply(&self, value: &Value) -> Result<WriteOutcome> {
        let rendered = self.render(value)?;

        if let Some(existing) = ninja_fs::read_optional(&self.path)?
            && existing == rendered
        {
            tracing::debug!(path = %self.path.display(), "Destination unchanged");
            return Ok(WriteOutcome::Unchanged);
        }

        ninja_fs::write_atomic(&self.path, &rendered)?;
        tracing::info!(
            path = %self.path.display(),
            bytes = rendered.len(),
            "Wrote destination"
        );
        Ok(WriteOutcome::Written)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.output)
    }
}
