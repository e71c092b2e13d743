//! AWS AppConfig backend
//!
//! Reads a hosted configuration through an AppConfig Data session. The
//! session token doubles as the version cursor: each successful poll hands
//! back the token for the next one, and an empty body means "no change".
//!
//! Applications, configuration profiles and environments may be referenced
//! by name; names are resolved through the AppConfig control plane once per
//! factory and cached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aws::{ApiError, ApiErrorKind, load_sdk_config, retry_transient};
use crate::registry::BackendOptions;
use crate::retry::{Retrier, RetryPolicy, sleep_until_or_cancel};
use crate::{
    Backend, BackendFactory, ChangeStream, Error, Params, Result, Revision, Version,
};

const KIND: &str = "appconfig";

/// The AppConfig Data service refuses session poll intervals below this.
pub const MINIMUM_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Identifiers of one hosted configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub application_id: String,
    pub configuration_profile_id: String,
    pub environment_id: String,
}

/// Response of one `GetLatestConfiguration` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestConfiguration {
    /// Empty when the configuration has not changed since the last call
    pub content: Vec<u8>,
    pub next_token: String,
    pub next_poll_interval: Duration,
}

/// Name lookups supported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Application,
    ConfigurationProfile { application_id: String },
    Environment { application_id: String },
}

impl Lookup {
    fn noun(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::ConfigurationProfile { .. } => "configuration profile",
            Self::Environment { .. } => "environment",
        }
    }
}

/// The AppConfig operations the backend depends on.
#[async_trait]
pub trait AppConfigApi: Send + Sync {
    /// Open a session and return its initial token.
    async fn start_session(
        &self,
        target: &Target,
        min_poll_interval: Duration,
    ) -> std::result::Result<String, ApiError>;

    /// Fetch configuration newer than `token`.
    async fn latest_configuration(
        &self,
        token: &str,
    ) -> std::result::Result<LatestConfiguration, ApiError>;

    /// List identifiers of all resources named `name`.
    async fn find_ids(
        &self,
        lookup: &Lookup,
        name: &str,
    ) -> std::result::Result<Vec<String>, ApiError>;
}

/// [`AppConfigApi`] implemented with the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkAppConfig {
    control: aws_sdk_appconfig::Client,
    data: aws_sdk_appconfigdata::Client,
}

impl SdkAppConfig {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            control: aws_sdk_appconfig::Client::new(config),
            data: aws_sdk_appconfigdata::Client::new(config),
        }
    }
}

#[async_trait]
impl AppConfigApi for SdkAppConfig {
    async fn start_session(
        &self,
        target: &Target,
        min_poll_interval: Duration,
    ) -> std::result::Result<String, ApiError> {
        let seconds = i32::try_from(min_poll_interval.as_secs()).unwrap_or(i32::MAX);
        let output = self
            .data
            .start_configuration_session()
            .application_identifier(&target.application_id)
            .environment_identifier(&target.environment_id)
            .configuration_profile_identifier(&target.configuration_profile_id)
            .required_minimum_poll_interval_in_seconds(seconds)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        output
            .initial_configuration_token()
            .map(str::to_string)
            .ok_or_else(|| ApiError::fatal("session started without a configuration token"))
    }

    async fn latest_configuration(
        &self,
        token: &str,
    ) -> std::result::Result<LatestConfiguration, ApiError> {
        let output = self
            .data
            .get_latest_configuration()
            .configuration_token(token)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let next_token = output
            .next_poll_configuration_token()
            .map(str::to_string)
            .ok_or_else(|| ApiError::fatal("response carried no next poll token"))?;
        let content = output
            .configuration()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();
        let interval = u64::try_from(output.next_poll_interval_in_seconds()).unwrap_or(0);

        Ok(LatestConfiguration {
            content,
            next_token,
            next_poll_interval: Duration::from_secs(interval),
        })
    }

    async fn find_ids(
        &self,
        lookup: &Lookup,
        name: &str,
    ) -> std::result::Result<Vec<String>, ApiError> {
        let mut ids = Vec::new();
        match lookup {
            Lookup::Application => {
                let mut pages = self.control.list_applications().into_paginator().send();
                while let Some(page) = pages.next().await {
                    let page = page.map_err(ApiError::from_sdk)?;
                    for item in page.items() {
                        if item.name() == Some(name) {
                            ids.extend(item.id().map(str::to_string));
                        }
                    }
                }
            }
            Lookup::ConfigurationProfile { application_id } => {
                let mut pages = self
                    .control
                    .list_configuration_profiles()
                    .application_id(application_id)
                    .into_paginator()
                    .send();
                while let Some(page) = pages.next().await {
                    let page = page.map_err(ApiError::from_sdk)?;
                    for item in page.items() {
                        if item.name() == Some(name) {
                            ids.extend(item.id().map(str::to_string));
                        }
                    }
                }
            }
            Lookup::Environment { application_id } => {
                let mut pages = self
                    .control
                    .list_environments()
                    .application_id(application_id)
                    .into_paginator()
                    .send();
                while let Some(page) = pages.next().await {
                    let page = page.map_err(ApiError::from_sdk)?;
                    for item in page.items() {
                        if item.name() == Some(name) {
                            ids.extend(item.id().map(str::to_string));
                        }
                    }
                }
            }
        }
        Ok(ids)
    }
}

/// Reads one hosted configuration from AWS AppConfig.
pub struct AppConfigBackend {
    api: Arc<dyn AppConfigApi>,
    target: Target,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl AppConfigBackend {
    pub fn new(
        api: Arc<dyn AppConfigApi>,
        target: Target,
        poll_interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            target,
            poll_interval: poll_interval.max(MINIMUM_POLL_INTERVAL),
            retry,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Start a session and read its first configuration.
    async fn read_once(&self) -> std::result::Result<Revision, ApiError> {
        let token = self
            .api
            .start_session(&self.target, self.poll_interval)
            .await?;
        let latest = self.api.latest_configuration(&token).await?;
        Ok(Revision::new(latest.content, Version::new(latest.next_token)))
    }
}

impl fmt::Display for AppConfigBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appconfig(application={}, profile={}, environment={})",
            self.target.application_id,
            self.target.configuration_profile_id,
            self.target.environment_id
        )
    }
}

#[async_trait]
impl Backend for AppConfigBackend {
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
        Box::new(AppConfigStream {
            name: self.to_string(),
            api: Arc::clone(&self.api),
            target: self.target.clone(),
            poll_interval: self.poll_interval,
            // A known token was just issued; the service rejects reuse before
            // the poll interval has passed.
            next_request: from.is_some().then(|| Instant::now() + self.poll_interval),
            token: from.map(|version| version.as_str().to_string()),
            retrier: self.retry.start(),
        })
    }
}

/// Change stream over an AppConfig Data session.
pub struct AppConfigStream {
    name: String,
    api: Arc<dyn AppConfigApi>,
    target: Target,
    poll_interval: Duration,
    token: Option<String>,
    next_request: Option<Instant>,
    retrier: Retrier,
}

impl AppConfigStream {
    fn retry_later(&mut self, error: &ApiError) -> Result<()> {
        let delay = self.retrier.failure(&self.name, error)?;
        self.next_request = Some(Instant::now() + delay);
        Ok(())
    }
}

#[async_trait]
impl ChangeStream for AppConfigStream {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        loop {
            if let Some(at) = self.next_request.take() {
                if !sleep_until_or_cancel(at, cancel).await {
                    return Ok(None);
                }
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let token = match self.token.clone() {
                Some(token) => token,
                None => match self.api.start_session(&self.target, self.poll_interval).await {
                    Ok(token) => {
                        tracing::debug!(backend = %self.name, "Started configuration session");
                        self.token = Some(token.clone());
                        token
                    }
                    Err(e) if e.is_transient() => {
                        self.retry_later(&e)?;
                        continue;
                    }
                    Err(e) => return Err(e.into_error(&self.name)),
                },
            };

            match self.api.latest_configuration(&token).await {
                Ok(latest) => {
                    self.retrier.success();
                    self.token = Some(latest.next_token.clone());
                    let wait = if latest.next_poll_interval.is_zero() {
                        self.poll_interval
                    } else {
                        latest.next_poll_interval
                    };
                    self.next_request = Some(Instant::now() + wait);

                    if latest.content.is_empty() {
                        tracing::debug!(backend = %self.name, "No configuration changes");
                        continue;
                    }
                    return Ok(Some(Revision::new(
                        latest.content,
                        Version::new(latest.next_token),
                    )));
                }
                Err(e) => match e.kind {
                    ApiErrorKind::TooEarly => {
                        let wait = self.poll_interval / 2;
                        tracing::debug!(
                            backend = %self.name,
                            wait_secs = wait.as_secs(),
                            "Polled too early, waiting"
                        );
                        self.next_request = Some(Instant::now() + wait);
                    }
                    ApiErrorKind::BadRequest => {
                        tracing::warn!(
                            backend = %self.name,
                            error = %e,
                            "Session token rejected, starting a new session"
                        );
                        self.token = None;
                        self.retry_later(&e)?;
                    }
                    ApiErrorKind::Transient => self.retry_later(&e)?,
                    ApiErrorKind::NotFound | ApiErrorKind::Fatal => {
                        return Err(e.into_error(&self.name));
                    }
                },
            }
        }
    }
}

type NameKey = (String, Lookup, String);

/// Factory for [`AppConfigBackend`].
///
/// Identifier parameters: `application_id` (`app_id`),
/// `configuration_profile_id` (`config_profile_id`), `environment_id`
/// (`env_id`). Name parameters: `application_name`,
/// `configuration_profile_name`, `environment_name`. Both accept an optional
/// `region`.
pub struct AppConfigFactory {
    options: BackendOptions,
    fixed_api: Option<Arc<dyn AppConfigApi>>,
    clients: Mutex<HashMap<String, Arc<dyn AppConfigApi>>>,
    names: DashMap<NameKey, String>,
}

impl AppConfigFactory {
    pub fn new(options: BackendOptions) -> Self {
        Self {
            options,
            fixed_api: None,
            clients: Mutex::new(HashMap::new()),
            names: DashMap::new(),
        }
    }

    /// Use `api` for every backend instead of SDK clients.
    pub fn with_api(options: BackendOptions, api: Arc<dyn AppConfigApi>) -> Self {
        Self {
            fixed_api: Some(api),
            ..Self::new(options)
        }
    }

    /// Client for `region`, created once and shared by all backends.
    async fn api(&self, region: Option<&str>) -> Arc<dyn AppConfigApi> {
        if let Some(api) = &self.fixed_api {
            return Arc::clone(api);
        }
        let mut clients = self.clients.lock().await;
        let key = region.unwrap_or_default().to_string();
        if let Some(api) = clients.get(&key) {
            return Arc::clone(api);
        }
        let config = load_sdk_config(region).await;
        let api: Arc<dyn AppConfigApi> = Arc::new(SdkAppConfig::new(&config));
        clients.insert(key, Arc::clone(&api));
        api
    }

    async fn resolve(
        &self,
        api: &dyn AppConfigApi,
        region: Option<&str>,
        lookup: Lookup,
        name: &str,
    ) -> Result<String> {
        let key = (
            region.unwrap_or_default().to_string(),
            lookup.clone(),
            name.to_string(),
        );
        if let Some(id) = self.names.get(&key) {
            tracing::trace!(kind = lookup.noun(), name, "Name resolved from cache");
            return Ok(id.clone());
        }

        let resolution = |message: String| Error::Resolution {
            kind: lookup.noun().to_string(),
            name: name.to_string(),
            message,
        };
        let ids = api
            .find_ids(&lookup, name)
            .await
            .map_err(|e| resolution(e.message))?;

        let id = match ids.as_slice() {
            [] => return Err(resolution("no match found".to_string())),
            [only] => only.clone(),
            [first, ..] => {
                tracing::warn!(
                    kind = lookup.noun(),
                    name,
                    matches = ids.len(),
                    chosen = %first,
                    "Name is ambiguous, using the first match"
                );
                first.clone()
            }
        };
        tracing::debug!(kind = lookup.noun(), name, id = %id, "Resolved name");
        self.names.insert(key, id.clone());
        Ok(id)
    }

    fn backend(&self, api: Arc<dyn AppConfigApi>, target: Target) -> Box<dyn Backend> {
        Box::new(AppConfigBackend::new(
            api,
            target,
            self.options.poll_interval,
            self.options.retry,
        ))
    }
}

#[async_trait]
impl BackendFactory for AppConfigFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn from_identifiers(&self, params: &Params) -> Result<Box<dyn Backend>> {
        let target = Target {
            application_id: params.require(KIND, &["application_id", "app_id"])?.to_string(),
            configuration_profile_id: params
                .require(KIND, &["configuration_profile_id", "config_profile_id"])?
                .to_string(),
            environment_id: params.require(KIND, &["environment_id", "env_id"])?.to_string(),
        };
        let api = self.api(params.get("region")).await;
        Ok(self.backend(api, target))
    }

    async fn from_names(&self, params: &Params) -> Result<Box<dyn Backend>> {
        let application = params.require(KIND, &["application_name"])?;
        let profile = params.require(KIND, &["configuration_profile_name"])?;
        let environment = params.require(KIND, &["environment_name"])?;
        let region = params.get("region");
        let api = self.api(region).await;

        let application_id = self
            .resolve(api.as_ref(), region, Lookup::Application, application)
            .await?;
        let configuration_profile_id = self
            .resolve(
                api.as_ref(),
                region,
                Lookup::ConfigurationProfile {
                    application_id: application_id.clone(),
                },
                profile,
            )
            .await?;
        let environment_id = self
            .resolve(
                api.as_ref(),
                region,
                Lookup::Environment {
                    application_id: application_id.clone(),
                },
                environment,
            )
            .await?;

        let target = Target {
            application_id,
            configuration_profile_id,
            environment_id,
        };
        Ok(self.backend(api, target))
    }
}
