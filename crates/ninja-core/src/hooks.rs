//! Post-write hooks
//!
//! After a destination is written, the object's hooks run in order through a
//! [`HookRunner`]. The default [`CommandHookRunner`] maps each hook name to a
//! command from `CONFIG_NINJA_HOOKS` and executes it as a subprocess.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::settings::{HookCommand, Settings};

/// Environment variable carrying the object key.
pub const OBJECT_ENV: &str = "CONFIG_NINJA_OBJECT";

/// Environment variable carrying the hook name.
pub const HOOK_ENV: &str = "CONFIG_NINJA_HOOK";

/// Result of running a single hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    /// The hook that was run
    pub hook: String,
    /// Whether the hook succeeded
    pub success: bool,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl HookReport {
    /// Report for a hook that succeeded without output.
    pub fn succeeded(hook: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Executes named hooks on behalf of an object.
#[async_trait]
pub trait HookRunner: Send + Sync {
    /// Whether `hook` can be run. Checked once at startup.
    fn knows(&self, _hook: &str) -> bool {
        true
    }

    /// Run `hooks` in order for object `key`.
    ///
    /// Stops at the first failing hook and returns [`Error::Hook`].
    async fn run(&self, key: &str, hooks: &[String]) -> Result<Vec<HookReport>>;
}

/// Runs hooks as subprocesses.
#[derive(Debug, Clone, Default)]
pub struct CommandHookRunner {
    commands: BTreeMap<String, HookCommand>,
}

impl CommandHookRunner {
    pub fn new(commands: BTreeMap<String, HookCommand>) -> Self {
        Self { commands }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.hooks().clone())
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    async fn execute(&self, key: &str, hook: &str) -> Result<HookReport> {
        let failed = |message: String| Error::Hook {
            key: key.to_string(),
            hook: hook.to_string(),
            message,
        };

        let command = self
            .commands
            .get(hook)
            .ok_or_else(|| failed("hook is not defined in CONFIG_NINJA_HOOKS".to_string()))?;

        let mut process = build_command(command);
        process
            .env(OBJECT_ENV, key)
            .env(HOOK_ENV, hook)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(hook, command = %command, "Running hook");
        let output = process
            .output()
            .await
            .map_err(|e| failed(format!("failed to start '{command}': {e}")))?;

        Ok(HookReport {
            hook: hook.to_string(),
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn build_command(command: &HookCommand) -> Command {
    match command {
        HookCommand::Shell(line) => {
            let mut process = if cfg!(windows) {
                let mut process = Command::new("cmd");
                process.arg("/C");
                process
            } else {
                let mut process = Command::new("sh");
                process.arg("-c");
                process
            };
            process.arg(line);
            process
        }
        HookCommand::Program {
            cmd,
            args,
            cwd,
            env,
        } => {
            let mut process = Command::new(cmd);
            process.args(args).envs(env);
            if let Some(dir) = cwd.as_ref().map(PathBuf::as_path) {
                process.current_dir(dir);
            }
            process
        }
    }
}

#[async_trait]
impl HookRunner for CommandHookRunner {
    fn knows(&self, hook: &str) -> bool {
        self.commands.contains_key(hook)
    }

    async fn run(&self, key: &str, hooks: &[String]) -> Result<Vec<HookReport>> {
        let mut reports = Vec::with_capacity(hooks.len());

        for hook in hooks {
            let report = self.execute(key, hook).await?;
            if !report.success {
                let stderr = report.stderr.trim();
                let message = if stderr.is_empty() {
                    format!("exited with status {:?}", report.exit_code)
                } else {
                    format!("exited with status {:?}: {}", report.exit_code, stderr)
                };
                return Err(Error::Hook {
                    key: key.to_string(),
                    hook: hook.clone(),
                    message,
                });
            }
            tracing::info!(hook = %hook, "Hook succeeded");
            reports.push(report);
        }

        Ok(reports)
    }
}
