//! Bounded exponential backoff for transient source failures

use std::fmt;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Retry settings applied to transient failures while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound on the delay between attempts
    pub max_interval: Duration,
    /// Consecutive failures tolerated before the stream gives up
    pub max_consecutive_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            max_interval: Duration::from_secs(60),
            max_consecutive_failures: 5,
        }
    }
}

impl RetryPolicy {
    /// Start tracking failures for one stream.
    pub fn start(&self) -> Retrier {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial)
            .with_max_interval(self.max_interval)
            .with_multiplier(2.0)
            .with_randomization_factor(0.1)
            .with_max_elapsed_time(None)
            .build();
        Retrier {
            policy: *self,
            backoff,
            failures: 0,
        }
    }
}

/// Per-stream failure counter backed by an exponential backoff.
#[derive(Debug)]
pub struct Retrier {
    policy: RetryPolicy,
    backoff: ExponentialBackoff,
    failures: u32,
}

impl Retrier {
    /// Record a transient failure.
    ///
    /// Returns the delay before the next attempt, or
    /// [`Error::RetriesExhausted`] once the consecutive failure budget is
    /// spent.
    pub fn failure(&mut self, backend: &str, cause: impl fmt::Display) -> Result<Duration> {
        self.failures += 1;
        if self.failures >= self.policy.max_consecutive_failures {
            return Err(Error::RetriesExhausted {
                backend: backend.to_string(),
                attempts: self.failures,
                message: cause.to_string(),
            });
        }

        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.policy.max_interval);
        tracing::warn!(
            backend,
            attempt = self.failures,
            delay_ms = delay.as_millis() as u64,
            error = %cause,
            "Transient failure, retrying"
        );
        Ok(delay)
    }

    /// Reset after a successful request.
    pub fn success(&mut self) {
        if self.failures > 0 {
            tracing::debug!(after = self.failures, "Recovered from transient failures");
        }
        self.failures = 0;
        self.backoff.reset();
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Sleep until `deadline` unless `cancel` fires first.
///
/// Returns `false` when cancelled.
pub async fn sleep_until_or_cancel(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep_until(deadline) => true,
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    sleep_until_or_cancel(Instant::now() + duration, cancel).await
}
