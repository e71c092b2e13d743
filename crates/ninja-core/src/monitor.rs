//! Concurrent per-object change loops
//!
//! The [`Monitor`] runs one task per [`ConfigObject`]. Each task fetches the
//! initial value, applies it, then follows the backend's change stream until
//! cancelled or a fatal error ends it:
//!
//! ```text
//!   Init ──fetch──▶ Applying ──▶ Polling ⇄ Applying
//!     └─────────────────┴───────────┴──▶ Failed | Stopped
//! ```
//!
//! Failures stay inside the object's task; the other objects keep running.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ninja_backend::CancellationToken;
use ninja_format::Value;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::destination::WriteOutcome;
use crate::error::{Error, Result};
use crate::hooks::HookRunner;
use crate::object::ConfigObject;

/// State of one object's loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Init,
    Applying,
    Polling,
    /// Ended by a fatal error
    Failed,
    /// Ended by cancellation or end of the change stream
    Stopped,
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Applying => "applying",
            Self::Polling => "polling",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How one object's loop ended.
#[derive(Debug)]
pub struct ObjectOutcome {
    pub key: String,
    /// `Failed` or `Stopped`
    pub state: ObjectState,
    /// Values handled (writes when applying, values seen when observing)
    pub handled: usize,
    pub error: Option<Error>,
}

/// Outcome of every object loop.
#[derive(Debug, Default)]
pub struct MonitorReport {
    pub outcomes: Vec<ObjectOutcome>,
}

impl MonitorReport {
    pub fn failed(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == ObjectState::Failed)
    }

    /// Whether every loop ended in `Failed`.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.failed().count() == self.outcomes.len()
    }
}

/// Called after every apply with the object key and outcome.
pub type ApplyCallback = Arc<dyn Fn(&str, WriteOutcome) + Send + Sync>;

/// Called with every decoded value when observing.
pub type ValueCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// What a loop does with each decoded value.
#[async_trait]
trait Sink: Send + Sync {
    /// Handle one value; returns whether it counts as handled.
    async fn accept(&self, object: &ConfigObject, value: Value) -> Result<bool>;
}

/// Writes to the destination and runs hooks after each write.
struct ApplySink {
    hooks: Arc<dyn HookRunner>,
    on_apply: ApplyCallback,
}

#[async_trait]
impl Sink for ApplySink {
    async fn accept(&self, object: &ConfigObject, value: Value) -> Result<bool> {
        let outcome = object.apply(value).await?;
        (self.on_apply)(object.key(), outcome);

        if outcome == WriteOutcome::Unchanged {
            return Ok(false);
        }
        if !object.hooks().is_empty() {
            // The write stands even when a hook fails.
            if let Err(e) = self.hooks.run(object.key(), object.hooks()).await {
                tracing::error!(error = %e, "Hook failed");
            }
        }
        Ok(true)
    }
}

/// Hands each value to a callback; no destination, no hooks.
struct ObserveSink {
    on_value: ValueCallback,
}

#[async_trait]
impl Sink for ObserveSink {
    async fn accept(&self, object: &ConfigObject, value: Value) -> Result<bool> {
        (self.on_value)(object.key(), &value);
        Ok(true)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "panicked".to_string(),
        },
    }
}

fn transition(state: ObjectState) {
    tracing::debug!(%state, "State transition");
}

async fn drive(
    object: &ConfigObject,
    sink: &dyn Sink,
    cancel: &CancellationToken,
    handled: &mut usize,
) -> Result<()> {
    transition(ObjectState::Init);
    let Some(revision) = object.backend().fetch_retrying(cancel).await? else {
        return Ok(());
    };

    transition(ObjectState::Applying);
    let value = object.decode(&revision.content)?;
    if sink.accept(object, value).await? {
        *handled += 1;
    }

    let mut stream = object.backend().poll(Some(revision.version));
    loop {
        transition(ObjectState::Polling);
        let Some(revision) = stream.next(cancel).await? else {
            return Ok(());
        };

        transition(ObjectState::Applying);
        tracing::debug!(version = %revision.version, "Change detected");
        let value = object.decode(&revision.content)?;
        if sink.accept(object, value).await? {
            *handled += 1;
        }
    }
}

async fn run_object(
    object: ConfigObject,
    sink: Arc<dyn Sink>,
    cancel: CancellationToken,
) -> ObjectOutcome {
    let mut handled = 0;
    let result = drive(&object, sink.as_ref(), &cancel, &mut handled).await;
    let key = object.key().to_string();

    match result {
        Ok(()) => {
            transition(ObjectState::Stopped);
            ObjectOutcome {
                key,
                state: ObjectState::Stopped,
                handled,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Object failed");
            transition(ObjectState::Failed);
            ObjectOutcome {
                key,
                state: ObjectState::Failed,
                handled,
                error: Some(e),
            }
        }
    }
}

/// Runs object loops concurrently until cancelled.
pub struct Monitor {
    hooks: Arc<dyn HookRunner>,
    cancel: CancellationToken,
}

impl Monitor {
    pub fn new(hooks: Arc<dyn HookRunner>, cancel: CancellationToken) -> Self {
        Self { hooks, cancel }
    }

    /// Apply every change to each object's destination, running hooks after
    /// each write. Returns once every loop has ended.
    pub async fn run(&self, objects: Vec<ConfigObject>, on_apply: ApplyCallback) -> MonitorReport {
        let sink = Arc::new(ApplySink {
            hooks: Arc::clone(&self.hooks),
            on_apply,
        });
        self.spawn_all(objects, sink).await
    }

    /// Decode every change and hand it to `on_value` without writing.
    pub async fn observe(
        &self,
        objects: Vec<ConfigObject>,
        on_value: ValueCallback,
    ) -> MonitorReport {
        self.spawn_all(objects, Arc::new(ObserveSink { on_value }))
            .await
    }

    async fn spawn_all(&self, objects: Vec<ConfigObject>, sink: Arc<dyn Sink>) -> MonitorReport {
        let mut tasks = JoinSet::new();
        let mut keys = HashMap::new();

        for object in objects {
            let key = object.key().to_string();
            let span = tracing::info_span!("object", key = %key);
            let handle = tasks
                .spawn(run_object(object, Arc::clone(&sink), self.cancel.clone()).instrument(span));
            keys.insert(handle.id(), key);
        }
        tracing::info!(objects = keys.len(), "Monitoring started");

        let mut report = MonitorReport::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, outcome)) => report.outcomes.push(outcome),
                Err(e) => {
                    let key = keys.remove(&e.id()).unwrap_or_default();
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    tracing::error!(key = %key, error = %message, "Object task ended abnormally");
                    report.outcomes.push(ObjectOutcome {
                        key: key.clone(),
                        state: ObjectState::Failed,
                        handled: 0,
                        error: Some(Error::Task { key, message }),
                    });
                }
            }
        }

        tracing::info!(
            failed = report.failed().count(),
            total = report.outcomes.len(),
            "Monitoring finished"
        );
        report
    }
}
