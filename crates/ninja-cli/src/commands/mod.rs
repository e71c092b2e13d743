//! Command implementations for ninja-cli

pub mod apply;
pub mod get;
pub mod hook;
pub mod monitor;
pub mod print;

use std::sync::Arc;

use ninja_backend::BackendRegistry;
use ninja_core::{CommandHookRunner, Settings, SyncEngine};

use crate::error::Result;

pub use apply::run_apply;
pub use get::run_get;
pub use hook::run_hook;
pub use monitor::run_monitor;
pub use print::run_print;

/// Engine over the settings with the built-in backends and command hooks.
pub fn engine(settings: &Settings) -> Result<SyncEngine> {
    let registry = BackendRegistry::with_builtins(settings.backend_options());
    let hooks = Arc::new(CommandHookRunner::from_settings(settings));
    Ok(SyncEngine::new(settings, registry, hooks)?)
}
