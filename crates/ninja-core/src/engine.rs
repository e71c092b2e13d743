//! Operations over the configured objects: get, apply and monitor

use std::sync::Arc;

use ninja_backend::{BackendRegistry, CancellationToken};
use ninja_format::Value;
use tracing::Instrument;

use crate::destination::WriteOutcome;
use crate::error::{Error, Result};
use crate::hooks::{HookReport, HookRunner};
use crate::monitor::{ApplyCallback, Monitor, MonitorReport, ValueCallback};
use crate::object::ConfigObject;
use crate::settings::Settings;
use crate::spec::ObjectSpec;

/// Result of a one-shot apply for one object.
#[derive(Debug)]
pub struct ApplyEntry {
    pub key: String,
    /// Write outcome, or the error that prevented it
    pub result: Result<WriteOutcome>,
    /// Hooks that ran after a write
    pub hooks: Vec<HookReport>,
    /// Hook failure; the write itself stands
    pub hook_error: Option<Error>,
}

impl ApplyEntry {
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.hook_error.is_none()
    }
}

/// Report of a one-shot apply over several objects.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub entries: Vec<ApplyEntry>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(ApplyEntry::is_success)
    }

    pub fn written(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, Ok(WriteOutcome::Written)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ApplyEntry> {
        self.entries.iter().filter(|e| !e.is_success())
    }
}

/// Entry point for every operation on the configured objects.
pub struct SyncEngine {
    specs: Vec<ObjectSpec>,
    registry: BackendRegistry,
    hooks: Arc<dyn HookRunner>,
}

impl SyncEngine {
    /// Validate the settings and bind them to a registry and hook runner.
    pub fn new(
        settings: &Settings,
        registry: BackendRegistry,
        hooks: Arc<dyn HookRunner>,
    ) -> Result<Self> {
        Self::from_specs(settings.objects()?, registry, hooks)
    }

    /// Build from already validated object specs.
    pub fn from_specs(
        specs: Vec<ObjectSpec>,
        registry: BackendRegistry,
        hooks: Arc<dyn HookRunner>,
    ) -> Result<Self> {
        let mut problems = Vec::new();
        for spec in &specs {
            if !registry.contains(&spec.source.backend) {
                problems.push(
                    Error::configuration(
                        &spec.key,
                        format!(
                            "unknown backend '{}' (available: {})",
                            spec.source.backend,
                            registry.kinds().join(", ")
                        ),
                    )
                    .to_string(),
                );
            }
            for hook in spec.hooks.iter().filter(|h| !hooks.knows(h)) {
                problems.push(
                    Error::configuration(&spec.key, format!("hook '{hook}' is not defined"))
                        .to_string(),
                );
            }
        }
        if !problems.is_empty() {
            return Err(Error::Validation { problems });
        }

        Ok(Self {
            specs,
            registry,
            hooks,
        })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.key.as_str()).collect()
    }

    pub fn specs(&self) -> &[ObjectSpec] {
        &self.specs
    }

    /// Specs for `keys`, or all of them when `keys` is empty.
    pub fn select(&self, keys: &[String]) -> Result<Vec<&ObjectSpec>> {
        if keys.is_empty() {
            return Ok(self.specs.iter().collect());
        }
        keys.iter()
            .map(|key| {
                self.specs
                    .iter()
                    .find(|s| &s.key == key)
                    .ok_or_else(|| Error::UnknownObject {
                        key: key.clone(),
                        available: self.keys().into_iter().map(str::to_string).collect(),
                    })
            })
            .collect()
    }

    /// Construct the objects for `keys`. Any failure aborts.
    pub async fn build(&self, keys: &[String]) -> Result<Vec<ConfigObject>> {
        let mut objects = Vec::new();
        for spec in self.select(keys)? {
            objects.push(ConfigObject::build(spec, &self.registry).await?);
        }
        Ok(objects)
    }

    /// Fetch and decode each selected object without touching destinations.
    pub async fn get(&self, keys: &[String]) -> Result<Vec<(String, Value)>> {
        let mut values = Vec::new();
        for object in self.build(keys).await? {
            let (value, version) = object.fetch().await?;
            tracing::debug!(key = object.key(), version = %version, "Fetched value");
            for hook in object.hooks() {
                tracing::debug!(key = object.key(), hook = %hook, "Skipping hook");
            }
            values.push((object.key().to_string(), value));
        }
        Ok(values)
    }

    /// Fetch, write and run hooks once for each selected object.
    ///
    /// A failing object does not stop the others; check
    /// [`ApplyReport::is_success`].
    pub async fn apply(&self, keys: &[String]) -> Result<ApplyReport> {
        let specs = self.select(keys)?;
        let mut report = ApplyReport::default();

        for spec in specs {
            let span = tracing::info_span!("object", key = %spec.key);
            report.entries.push(self.apply_entry(spec).instrument(span).await);
        }

        Ok(report)
    }

    async fn apply_entry(&self, spec: &ObjectSpec) -> ApplyEntry {
        let mut entry = ApplyEntry {
            key: spec.key.clone(),
            result: Ok(WriteOutcome::Unchanged),
            hooks: Vec::new(),
            hook_error: None,
        };

        let object = match self.apply_one(spec).await {
            Ok((outcome, object)) => {
                entry.result = Ok(outcome);
                object
            }
            Err(e) => {
                tracing::error!(error = %e, "Apply failed");
                entry.result = Err(e);
                return entry;
            }
        };

        if entry.result.as_ref().is_ok_and(|o| *o == WriteOutcome::Written)
            && !object.hooks().is_empty()
        {
            match self.hooks.run(object.key(), object.hooks()).await {
                Ok(reports) => entry.hooks = reports,
                Err(e) => {
                    tracing::error!(error = %e, "Hook failed");
                    entry.hook_error = Some(e);
                }
            }
        }
        entry
    }

    async fn apply_one(&self, spec: &ObjectSpec) -> Result<(WriteOutcome, ConfigObject)> {
        let object = ConfigObject::build(spec, &self.registry).await?;
        let (value, _) = object.fetch().await?;
        let outcome = object.apply(value).await?;
        Ok((outcome, object))
    }

    /// Run the monitor over `keys` until `cancel` fires.
    ///
    /// Fails only when the objects cannot be built.
    pub async fn monitor(
        &self,
        keys: &[String],
        cancel: CancellationToken,
        on_apply: ApplyCallback,
    ) -> Result<MonitorReport> {
        let objects = self.build(keys).await?;
        let monitor = Monitor::new(Arc::clone(&self.hooks), cancel);
        Ok(monitor.run(objects, on_apply).await)
    }

    /// Follow changes of `keys` read-only until `cancel` fires.
    pub async fn observe(
        &self,
        keys: &[String],
        cancel: CancellationToken,
        on_value: ValueCallback,
    ) -> Result<MonitorReport> {
        let objects = self.build(keys).await?;
        let monitor = Monitor::new(Arc::clone(&self.hooks), cancel);
        Ok(monitor.observe(objects, on_value).await)
    }
}
