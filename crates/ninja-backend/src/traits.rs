//! Backend and ChangeStream traits

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Opaque cursor marking the last observed state of a source.
///
/// Only the backend that produced a version interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content read from a source, paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub content: Vec<u8>,
    pub version: Version,
}

impl Revision {
    pub fn new(content: impl Into<Vec<u8>>, version: Version) -> Self {
        Self {
            content: content.into(),
            version,
        }
    }
}

/// A configuration source.
///
/// Backends are owned by exactly one object's task. `Display` renders the
/// identifier of the source for logs.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Display {
    /// Registry tag of this backend
    fn kind(&self) -> &'static str;

    /// Read the current content once.
    ///
    /// Fails with [`crate::Error::Unavailable`] when the source cannot be
    /// reached and [`crate::Error::NotFound`] when it does not exist.
    async fn fetch(&self) -> Result<Revision>;

    /// Read the current content, retrying transient failures under the
    /// backend's retry policy.
    ///
    /// Returns `Ok(None)` once `cancel` fires. The default makes a single
    /// [`Backend::fetch`] attempt.
    async fn fetch_retrying(&self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            revision = self.fetch() => revision.map(Some),
        }
    }

    /// Start observing changes newer than `from`.
    ///
    /// The returned stream is lazy: no I/O happens until the first call to
    /// [`ChangeStream::next`]. With `from == None` the first element is the
    /// current content.
    fn poll(&self, from: Option<Version>) -> Box<dyn ChangeStream>;
}

/// An unbounded, pull-based sequence of changes.
#[async_trait]
pub trait ChangeStream: Send {
    /// Wait for the next change.
    ///
    /// Returns `Ok(None)` once `cancel` fires (or the sequence ends), and
    /// `Err` only for failures the backend will not recover from. Transient
    /// failures are retried internally.
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Revision>>;
}
