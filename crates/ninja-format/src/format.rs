//! Format tags and the handler trait

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Position, Result};
use crate::handlers::{JsonHandler, RawHandler, TomlHandler, YamlHandler};
use crate::Value;

/// Supported serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Raw,
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Every tag accepted by [`Format::from_str`].
    pub const TAGS: &'static [&'static str] = &["json", "raw", "toml", "yaml", "yml"];

    /// Canonical tag for this format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }

    /// Whether the given string names a format (as opposed to a template path).
    pub fn is_tag(tag: &str) -> bool {
        Self::TAGS.contains(&tag)
    }

    /// The handler implementing this format.
    pub fn handler(&self) -> &'static dyn FormatHandler {
        match self {
            Self::Raw => &RawHandler,
            Self::Json => &JsonHandler,
            Self::Yaml => &YamlHandler,
            Self::Toml => &TomlHandler,
        }
    }

    /// Decode raw source bytes into a structured value.
    pub fn parse(&self, bytes: &[u8]) -> Result<Value> {
        let source = std::str::from_utf8(bytes).map_err(|e| {
            Error::decode(
                *self,
                format!("content is not valid UTF-8: {e}"),
                Some(Position {
                    offset: Some(e.valid_up_to()),
                    ..Position::default()
                }),
            )
        })?;
        self.handler().parse(source)
    }

    /// Serialize a structured value into this format.
    pub fn render(&self, value: &Value) -> Result<String> {
        self.handler().render(value)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(Self::Raw),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            other => Err(Error::UnknownFormat {
                tag: other.to_string(),
            }),
        }
    }
}

/// Trait for format handlers.
///
/// A handler converts between source text and the structured [`Value`]
/// model. Implementations must be stateless.
pub trait FormatHandler: Send + Sync {
    /// The format this handler implements
    fn format(&self) -> Format;

    /// Parse source text into a value.
    fn parse(&self, source: &str) -> Result<Value>;

    /// Render a value into source text.
    fn render(&self, value: &Value) -> Result<String>;
}
