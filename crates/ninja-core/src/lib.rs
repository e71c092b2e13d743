//! Core orchestration layer for config-ninja
//!
//! This crate ties sources, formats and destinations together:
//!
//! - **Settings**: discovery and parsing of the settings file, validated into
//!   [`ObjectSpec`]s
//! - **Destination**: render a value and write it only when the bytes differ
//! - **ConfigObject**: one backend bound to one destination plus hooks
//! - **Monitor**: one independent change loop per object, until cancelled
//! - **SyncEngine**: the get / apply / monitor operations
//!
//! # Architecture
//!
//! ```text
//!                  CLI
//!                   |
//!               ninja-core
//!                   |
//!      +------------+------------+
//!      |            |            |
//! ninja-backend ninja-format  ninja-fs
//! ```

pub mod destination;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod monitor;
pub mod object;
pub mod settings;
pub mod spec;

pub use destination::{Destination, WriteOutcome};
pub use engine::{ApplyEntry, ApplyReport, SyncEngine};
pub use error::{Error, Result};
pub use hooks::{CommandHookRunner, HookReport, HookRunner};
pub use monitor::{
    ApplyCallback, Monitor, MonitorReport, ObjectOutcome, ObjectState, ValueCallback,
};
pub use object::ConfigObject;
pub use settings::{HookCommand, LoggingSettings, PollingSettings, Settings, SettingsFile};
pub use spec::{DestSpec, ObjectSpec, OutputSpec, SourceSpec};
