//! Serialization formats and templates for config-ninja
//!
//! Every source is decoded into a structured [`Value`] (a JSON data model)
//! and every destination is produced from one, either by serializing to a
//! [`Format`] or by rendering a [`Template`].
//!
//! ```text
//! bytes ──Format::parse──▶ Value ──Output::render──▶ text
//!                                   ├─ Format (raw/json/yaml/toml)
//!                                   └─ Template (jinja)
//! ```

pub mod error;
pub mod format;
pub mod handlers;
pub mod output;
pub mod template;

pub use error::{Error, Position, Result};
pub use format::{Format, FormatHandler};
pub use output::Output;
pub use serde_json::Value;
pub use template::Template;
