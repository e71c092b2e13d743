//! A source bound to a destination

use std::fmt;
use std::sync::Arc;

use ninja_backend::{Backend, BackendRegistry, Version};
use ninja_format::{Format, Output, Template, Value};

use crate::destination::{Destination, WriteOutcome};
use crate::error::{Error, Result};
use crate::spec::{ObjectSpec, OutputSpec};

/// One managed object: a backend and its source format, a destination, and
/// the hooks to run after each write.
///
/// The backend is owned exclusively by the object.
pub struct ConfigObject {
    key: String,
    backend: Box<dyn Backend>,
    source_format: Format,
    destination: Arc<Destination>,
    hooks: Vec<String>,
}

impl ConfigObject {
    pub fn new(
        key: impl Into<String>,
        backend: Box<dyn Backend>,
        source_format: Format,
        destination: Destination,
        hooks: Vec<String>,
    ) -> Self {
        Self {
            key: key.into(),
            backend,
            source_format,
            destination: Arc::new(destination),
            hooks,
        }
    }

    /// Construct the backend and load the template named by `spec`.
    pub async fn build(spec: &ObjectSpec, registry: &BackendRegistry) -> Result<Self> {
        let output = match &spec.dest.output {
            OutputSpec::Format(format) => Output::Format(*format),
            OutputSpec::Template(path) => Output::Template(Template::load(path)?),
        };
        let backend = registry
            .build(&spec.source.backend, &spec.source.construction)
            .await
            .map_err(|e| match e {
                e if e.is_configuration() => Error::configuration(&spec.key, e.to_string()),
                e => Error::Backend(e),
            })?;

        tracing::debug!(key = %spec.key, backend = %backend, "Built object");
        Ok(Self::new(
            spec.key.clone(),
            backend,
            spec.source.format,
            Destination::new(&spec.dest.path, output),
            spec.hooks.clone(),
        ))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn source_format(&self) -> Format {
        self.source_format
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn hooks(&self) -> &[String] {
        &self.hooks
    }

    /// Decode backend content with the source format.
    pub fn decode(&self, content: &[u8]) -> Result<Value> {
        Ok(self.source_format.parse(content)?)
    }

    /// Fetch and decode the current value once.
    pub async fn fetch(&self) -> Result<(Value, Version)> {
        let revision = self.backend.fetch().await?;
        Ok((self.decode(&revision.content)?, revision.version))
    }

    /// Apply `value` to the destination on a blocking thread.
    ///
    /// The write always runs to completion once started.
    pub async fn apply(&self, value: Value) -> Result<WriteOutcome> {
        let destination = Arc::clone(&self.destination);
        tokio::task::spawn_blocking(move || destination.apply(&value))
            .await
            .map_err(|e| Error::Task {
                key: self.key.clone(),
                message: e.to_string(),
            })?
    }
}

impl fmt::Display for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] -> {}",
            self.key, self.backend, self.source_format, self.destination
        )
    }
}

impl fmt::Debug for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigObject")
            .field("key", &self.key)
            .field("backend", &self.backend.to_string())
            .field("source_format", &self.source_format)
            .field("destination", &self.destination)
            .field("hooks", &self.hooks)
            .finish()
    }
}
