//! Tag-to-factory registry for backends

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::appconfig::AppConfigFactory;
use crate::local::LocalFactory;
use crate::secretsmanager::SecretsManagerFactory;
use crate::{Backend, Error, Params, Result, RetryPolicy};

/// How a backend should be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construction {
    /// Parameters carry exact identifiers
    Identifiers(Params),
    /// Parameters carry friendly names the backend resolves
    Names(Params),
}

impl Construction {
    pub fn params(&self) -> &Params {
        match self {
            Self::Identifiers(params) | Self::Names(params) => params,
        }
    }
}

/// Timing options shared by the built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    /// Polling interval for remote sources
    pub poll_interval: Duration,
    /// Polling interval for local files when notifications are unavailable
    pub local_fallback: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            local_fallback: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Constructor for one backend kind.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Tag the factory is registered under
    fn kind(&self) -> &'static str;

    /// Build from exact identifiers.
    async fn from_identifiers(&self, params: &Params) -> Result<Box<dyn Backend>>;

    /// Build from friendly names.
    ///
    /// Backends without a name lookup take the same parameters either way.
    async fn from_names(&self, params: &Params) -> Result<Box<dyn Backend>> {
        self.from_identifiers(params).await
    }
}

/// Registry of backend factories keyed by tag.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `local`, `appconfig` and `secretsmanager`.
    pub fn with_builtins(options: BackendOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LocalFactory::new(options.local_fallback)));
        registry.register(Arc::new(AppConfigFactory::new(options)));
        registry.register(Arc::new(SecretsManagerFactory::new(options)));
        registry
    }

    /// Register a factory, replacing any previous one with the same tag.
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    pub fn kinds(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Construct a backend of the given kind.
    pub async fn build(&self, kind: &str, construction: &Construction) -> Result<Box<dyn Backend>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| Error::UnknownBackend {
                kind: kind.to_string(),
                available: self.kinds(),
            })?;

        tracing::debug!(kind, ?construction, "Constructing backend");
        match construction {
            Construction::Identifiers(params) => factory.from_identifiers(params).await,
            Construction::Names(params) => factory.from_names(params).await,
        }
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
