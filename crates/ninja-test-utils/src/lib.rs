//! Shared test utilities for the config-ninja workspace.
//!
//! This crate provides standardised test fixtures for the crate test
//! suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`backend`]: [`ScriptedBackend`] replaying a programmed sequence of values
//! - [`hooks`]: [`RecordingHookRunner`] capturing hook invocations
//! - [`workspace`]: [`TestWorkspace`] for settings, sources and templates on disk

pub mod backend;
pub mod hooks;
pub mod workspace;

pub use backend::{ScriptedBackend, ScriptedFactory, Step};
pub use hooks::RecordingHookRunner;
pub use workspace::TestWorkspace;
