//! [`ScriptedBackend`]: a backend that replays a fixed script.
//!
//! The first step answers [`Backend::fetch`]; every later step is emitted by
//! the change stream, one per `next`. Once the script is exhausted the
//! stream idles until cancelled. [`Backend::fetch_retrying`] skips over
//! leading [`Step::Transient`] steps the way remote backends retry.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ninja_backend::aws::{ApiError, ApiErrorKind, retry_transient};
use ninja_backend::{
    Backend, BackendFactory, CancellationToken, ChangeStream, Error, Params, Result, Revision,
    RetryPolicy, Version,
};

/// Short retry schedule so tests recover in milliseconds.
const RETRY: RetryPolicy = RetryPolicy {
    initial: Duration::from_millis(10),
    max_interval: Duration::from_millis(50),
    max_consecutive_failures: 3,
};

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Emit this content
    Value(String),
    /// Fail permanently with this message
    Fail(String),
    /// Fail with a retryable error
    Transient(String),
}

impl Step {
    pub fn value(content: impl Into<String>) -> Self {
        Self::Value(content.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }
}

#[derive(Debug)]
struct Script {
    name: String,
    steps: Mutex<VecDeque<Step>>,
    served: AtomicUsize,
    delay: Duration,
}

impl Script {
    fn pop(&self) -> Option<Step> {
        self.steps.lock().unwrap().pop_front()
    }

    fn attempt(&self, step: Option<Step>) -> std::result::Result<Revision, ApiError> {
        let Some(step) = step else {
            return Err(ApiError::new(ApiErrorKind::NotFound, "script is empty"));
        };
        let n = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        match step {
            Step::Value(content) => Ok(Revision::new(content, Version::new(format!("v{n}")))),
            Step::Fail(message) => Err(ApiError::fatal(message)),
            Step::Transient(message) => Err(ApiError::transient(message)),
        }
    }

    fn revision(&self, step: Step) -> Result<Revision> {
        self.attempt(Some(step))
            .map_err(|e| e.into_error(&format!("scripted({})", self.name)))
    }
}

/// A backend replaying a programmed sequence of values and failures.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        Self::with_delay(name, steps, Duration::ZERO)
    }

    /// Like [`ScriptedBackend::new`], waiting `delay` before each emitted change.
    pub fn with_delay(
        name: impl Into<String>,
        steps: impl IntoIterator<Item = Step>,
        delay: Duration,
    ) -> Self {
        Self {
            script: Arc::new(Script {
                name: name.into(),
                steps: Mutex::new(steps.into_iter().collect()),
                served: AtomicUsize::new(0),
                delay,
            }),
        }
    }

    /// Build from plain values.
    pub fn values<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(name, values.into_iter().map(Step::value))
    }

    /// Number of steps served so far.
    pub fn served(&self) -> usize {
        self.script.served.load(Ordering::SeqCst)
    }
}

impl fmt::Display for ScriptedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scripted({})", self.script.name)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn fetch(&self) -> Result<Revision> {
        self.script
            .attempt(self.script.pop())
            .map_err(|e| e.into_error(&self.to_string()))
    }

    async fn fetch_retrying(&self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        let script = &self.script;
        retry_transient(&self.to_string(), &RETRY, cancel, move || async move {
            script.attempt(script.pop())
        })
        .await
    }

    fn poll(&self, _from: Option<Version>) -> Box<dyn ChangeStream> {
        Box::new(ScriptedStream {
            script: Arc::clone(&self.script),
        })
    }
}

struct ScriptedStream {
    script: Arc<Script>,
}

#[async_trait]
impl ChangeStream for ScriptedStream {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        if !self.script.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.script.delay) => {}
            }
        }
        match self.script.pop() {
            Some(step) => self.script.revision(step).map(Some),
            None => {
                cancel.cancelled().await;
                Ok(None)
            }
        }
    }
}

/// Factory handing out [`ScriptedBackend`]s by their `name` parameter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    scripts: Arc<Mutex<BTreeMap<String, ScriptedBackend>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under its name; returns a handle for assertions.
    pub fn add(&self, name: &str, backend: ScriptedBackend) -> ScriptedBackend {
        self.scripts
            .lock()
            .unwrap()
            .insert(name.to_string(), backend.clone());
        backend
    }
}

#[async_trait]
impl BackendFactory for ScriptedFactory {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    async fn from_identifiers(&self, params: &Params) -> Result<Box<dyn Backend>> {
        let name = params.require("scripted", &["name"])?;
        let backend = self
            .scripts
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::invalid_params("scripted", format!("no script named '{name}'")))?;
        Ok(Box::new(backend))
    }
}
