//! Configuration sources for config-ninja
//!
//! A [`Backend`] produces configuration content from a named source and
//! detects when it changes. Each backend supports a one-shot
//! [`Backend::fetch`] and an unbounded [`ChangeStream`] obtained from
//! [`Backend::poll`], which yields one [`Revision`] per observed change.
//!
//! Backends are constructed through a [`BackendRegistry`] that maps a string
//! tag (`local`, `appconfig`, `secretsmanager`, ...) to a [`BackendFactory`].
//! Each factory supports two construction paths, selected by
//! [`Construction`]: exact identifiers, or friendly names that the backend
//! resolves itself.
//!
//! # Architecture
//!
//! ```text
//!   Construction ──▶ BackendRegistry ──▶ BackendFactory ──▶ Box<dyn Backend>
//!                                                              │
//!                                   fetch() ◀──────────────────┤
//!                                   poll(from) ──▶ ChangeStream::next(cancel)
//! ```

pub mod appconfig;
pub mod aws;
pub mod error;
pub mod local;
pub mod params;
pub mod registry;
pub mod retry;
pub mod secretsmanager;
pub mod traits;

pub use error::{Error, Result};
pub use params::Params;
pub use registry::{BackendFactory, BackendOptions, BackendRegistry, Construction};
pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
pub use traits::{Backend, ChangeStream, Revision, Version};
