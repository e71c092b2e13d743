//! Shared AWS plumbing: SDK config loading and error classification

use std::fmt;
use std::future::Future;

use aws_sdk_appconfigdata::config::Region;
use aws_sdk_appconfigdata::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio_util::sync::CancellationToken;

use crate::retry::{RetryPolicy, sleep_or_cancel};
use crate::{Error, Result};

/// Message AppConfig returns when a poll arrives before the minimum interval.
const TOO_EARLY: &str = "Request too early";

/// Broad category of an AWS API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Polled before the service allows; wait and retry
    TooEarly,
    /// The request was rejected as malformed (e.g. an expired session token)
    BadRequest,
    /// The referenced resource does not exist
    NotFound,
    /// Network, throttling or server-side failure worth retrying
    Transient,
    /// Anything else (credentials, permissions, ...)
    Fatal,
}

/// Classified failure returned by the AWS API seams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Fatal, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ApiErrorKind::Transient
    }

    /// Convert a non-retryable failure into a backend error.
    pub fn into_error(self, backend: &str) -> Error {
        match self.kind {
            ApiErrorKind::NotFound => Error::not_found(backend, self.message),
            _ => Error::unavailable(backend, self.message),
        }
    }

    /// Classify an SDK error by its service error code.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        let kind = match code.as_deref() {
            Some("BadRequestException") if message == TOO_EARLY => ApiErrorKind::TooEarly,
            Some("BadRequestException") => ApiErrorKind::BadRequest,
            Some("ResourceNotFoundException") => ApiErrorKind::NotFound,
            Some(
                "ThrottlingException"
                | "InternalServerException"
                | "InternalServiceError"
                | "ServiceUnavailableException"
                | "RequestTimeout",
            ) => ApiErrorKind::Transient,
            Some(_) => ApiErrorKind::Fatal,
            // Dispatch, timeout and response failures carry no service code.
            None => ApiErrorKind::Transient,
        };

        Self { kind, message }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Load the shared SDK configuration from the environment.
///
/// Credentials and region follow the standard AWS provider chain; `region`
/// overrides the region when given.
pub async fn load_sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Call `attempt` until it succeeds, backing off after transient failures.
///
/// Non-transient failures end the loop at once; `retry` bounds the number
/// of consecutive transient ones. Returns `Ok(None)` when `cancel` fires.
pub async fn retry_transient<T, F, Fut>(
    backend: &str,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ApiError>>,
{
    let mut retrier = retry.start();
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            result = attempt() => result,
        };
        match result {
            Ok(value) => return Ok(Some(value)),
            Err(e) if e.is_transient() => {
                let delay = retrier.failure(backend, &e)?;
                if !sleep_or_cancel(delay, cancel).await {
                    return Ok(None);
                }
            }
            Err(e) => return Err(e.into_error(backend)),
        }
    }
}
