//! [`RecordingHookRunner`]: captures hook invocations instead of running them.

use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use ninja_core::{Error, HookReport, HookRunner, Result};

/// Hook runner that records every call and fails selected hooks.
#[derive(Debug, Default)]
pub struct RecordingHookRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    failing: BTreeSet<String>,
    known: Option<BTreeSet<String>>,
}

impl RecordingHookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `hook` fail whenever it runs.
    pub fn failing(mut self, hook: &str) -> Self {
        self.failing.insert(hook.to_string());
        self
    }

    /// Only treat `hooks` as defined.
    pub fn knowing(mut self, hooks: &[&str]) -> Self {
        self.known = Some(hooks.iter().map(|h| h.to_string()).collect());
        self
    }

    /// Every `(key, hooks)` pair passed to `run`, in order.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `run` calls for `key`.
    pub fn runs_for(&self, key: &str) -> usize {
        self.calls().iter().filter(|(k, _)| k == key).count()
    }
}

#[async_trait]
impl HookRunner for RecordingHookRunner {
    fn knows(&self, hook: &str) -> bool {
        self.known.as_ref().is_none_or(|known| known.contains(hook))
    }

    async fn run(&self, key: &str, hooks: &[String]) -> Result<Vec<HookReport>> {
        self.calls
            .lock()
            .unwrap()
            .push((key.to_string(), hooks.to_vec()));

        let mut reports = Vec::new();
        for hook in hooks {
            if self.failing.contains(hook) {
                return Err(Error::Hook {
                    key: key.to_string(),
                    hook: hook.clone(),
                    message: "scripted failure".to_string(),
                });
            }
            reports.push(HookReport::succeeded(hook.clone()));
        }
        Ok(reports)
    }
}
