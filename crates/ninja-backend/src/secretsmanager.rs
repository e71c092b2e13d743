//! AWS Secrets Manager backend
//!
//! Content is the secret's string (or binary) value. Changes are detected by
//! polling for the version id carrying the `AWSCURRENT` stage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aws::{ApiError, ApiErrorKind, load_sdk_config, retry_transient};
use crate::registry::BackendOptions;
use crate::retry::{Retrier, RetryPolicy, sleep_until_or_cancel};
use crate::{
    Backend, BackendFactory, ChangeStream, Params, Result, Revision, Version,
};

const KIND: &str = "secretsmanager";

/// Staging label of the live secret version.
pub const CURRENT_STAGE: &str = "AWSCURRENT";

/// A secret value together with its version id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
    pub content: Vec<u8>,
    pub version_id: String,
}

/// The Secrets Manager operations the backend depends on.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    async fn get_secret_value(&self, secret_id: &str)
    -> std::result::Result<SecretValue, ApiError>;

    /// Version id currently staged as [`CURRENT_STAGE`], if any.
    async fn current_version(
        &self,
        secret_id: &str,
    ) -> std::result::Result<Option<String>, ApiError>;
}

/// [`SecretsApi`] implemented with the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkSecrets {
    client: aws_sdk_secretsmanager::Client,
}

impl SdkSecrets {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
        }
    }
}

#[async_trait]
impl SecretsApi for SdkSecrets {
    async fn get_secret_value(
        &self,
        secret_id: &str,
    ) -> std::result::Result<SecretValue, ApiError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let content = match (output.secret_string(), output.secret_binary()) {
            (Some(text), _) => text.as_bytes().to_vec(),
            (None, Some(blob)) => blob.as_ref().to_vec(),
            (None, None) => Vec::new(),
        };
        let version_id = output
            .version_id()
            .map(str::to_string)
            .ok_or_else(|| ApiError::fatal("secret value carried no version id"))?;

        Ok(SecretValue {
            content,
            version_id,
        })
    }

    async fn current_version(
        &self,
        secret_id: &str,
    ) -> std::result::Result<Option<String>, ApiError> {
        let mut pages = self
            .client
            .list_secret_version_ids()
            .secret_id(secret_id)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::from_sdk)?;
            for version in page.versions() {
                if version.version_stages().iter().any(|s| s == CURRENT_STAGE) {
                    return Ok(version.version_id().map(str::to_string));
                }
            }
        }
        Ok(None)
    }
}

/// Reads one secret from AWS Secrets Manager.
pub struct SecretsManagerBackend {
    api: Arc<dyn SecretsApi>,
    secret_id: String,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl SecretsManagerBackend {
    pub fn new(
        api: Arc<dyn SecretsApi>,
        secret_id: impl Into<String>,
        poll_interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            secret_id: secret_id.into(),
            poll_interval,
            retry,
        }
    }

    async fn read_once(&self) -> std::result::Result<Revision, ApiError> {
        let value = self.api.get_secret_value(&self.secret_id).await?;
        Ok(Revision::new(value.content, Version::new(value.version_id)))
    }
}

impl fmt::Display for SecretsManagerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secretsmanager({})", self.secret_id)
    }
}

#[async_trait]
impl Backend for SecretsManagerBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self) -> Result<Revision> {
        self.read_once()
            .await
            .map_err(|e| e.into_error(&self.to_string()))
    }

    async fn fetch_retrying(&self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        retry_transient(&self.to_string(), &self.retry, cancel, move || self.read_once()).await
    }

    fn poll(&self, from: Option<Version>) -> Box<dyn ChangeStream> {
        Box::new(SecretsStream {
            name: self.to_string(),
            api: Arc::clone(&self.api),
            secret_id: self.secret_id.clone(),
            poll_interval: self.poll_interval,
            last: from.map(|version| version.as_str().to_string()),
            next_check: None,
            retrier: self.retry.start(),
        })
    }
}

/// Change stream polling the current version of one secret.
pub struct SecretsStream {
    name: String,
    api: Arc<dyn SecretsApi>,
    secret_id: String,
    poll_interval: Duration,
    last: Option<String>,
    next_check: Option<Instant>,
    retrier: Retrier,
}

impl SecretsStream {
    fn handle(&mut self, error: ApiError) -> Result<()> {
        if error.kind != ApiErrorKind::Transient {
            return Err(error.into_error(&self.name));
        }
        let delay = self.retrier.failure(&self.name, &error)?;
        self.next_check = Some(Instant::now() + delay);
        Ok(())
    }
}

#[async_trait]
impl ChangeStream for SecretsStream {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        loop {
            if let Some(at) = self.next_check.take() {
                if !sleep_until_or_cancel(at, cancel).await {
                    return Ok(None);
                }
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let current = match self.api.current_version(&self.secret_id).await {
                Ok(current) => current,
                Err(e) => {
                    self.handle(e)?;
                    continue;
                }
            };
            self.retrier.success();
            self.next_check = Some(Instant::now() + self.poll_interval);

            match current {
                Some(version) if self.last.as_deref() != Some(version.as_str()) => {
                    match self.api.get_secret_value(&self.secret_id).await {
                        Ok(value) => {
                            self.last = Some(value.version_id.clone());
                            return Ok(Some(Revision::new(
                                value.content,
                                Version::new(value.version_id),
                            )));
                        }
                        Err(e) => self.handle(e)?,
                    }
                }
                Some(_) => tracing::debug!(backend = %self.name, "No secret changes"),
                None => tracing::warn!(
                    backend = %self.name,
                    "No version staged as {CURRENT_STAGE}"
                ),
            }
        }
    }
}

/// Factory for [`SecretsManagerBackend`].
///
/// Parameters: `secret_id` (alias `secret_name`) and an optional `region`.
pub struct SecretsManagerFactory {
    options: BackendOptions,
    fixed_api: Option<Arc<dyn SecretsApi>>,
    clients: Mutex<HashMap<String, Arc<dyn SecretsApi>>>,
}

impl SecretsManagerFactory {
    pub fn new(options: BackendOptions) -> Self {
        Self {
            options,
            fixed_api: None,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Use `api` for every backend instead of SDK clients.
    pub fn with_api(options: BackendOptions, api: Arc<dyn SecretsApi>) -> Self {
        Self {
            fixed_api: Some(api),
            ..Self::new(options)
        }
    }

    async fn api(&self, region: Option<&str>) -> Arc<dyn SecretsApi> {
        if let Some(api) = &self.fixed_api {
            return Arc::clone(api);
        }
        let mut clients = self.clients.lock().await;
        let key = region.unwrap_or_default().to_string();
        if let Some(api) = clients.get(&key) {
            return Arc::clone(api);
        }
        let config = load_sdk_config(region).await;
        let api: Arc<dyn SecretsApi> = Arc::new(SdkSecrets::new(&config));
        clients.insert(key, Arc::clone(&api));
        api
    }
}

#[async_trait]
impl BackendFactory for SecretsManagerFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn from_identifiers(&self, params: &Params) -> Result<Box<dyn Backend>> {
        let secret_id = params.require(KIND, &["secret_id", "secret_name"])?;
        let api = self.api(params.get("region")).await;
        Ok(Box::new(SecretsManagerBackend::new(
            api,
            secret_id,
            self.options.poll_interval,
            self.options.retry,
        )))
    }
}
