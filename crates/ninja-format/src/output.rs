//! Destination render strategy

use std::fmt;

use crate::error::Result;
use crate::{Format, Template, Value};

/// How a destination turns a value into text: direct serialization or a
/// template. The two are mutually exclusive.
#[derive(Debug)]
pub enum Output {
    Format(Format),
    Template(Template),
}

impl Output {
    /// Render the value into destination text.
    pub fn render(&self, value: &Value) -> Result<String> {
        match self {
            Self::Format(format) => format.render(value),
            Self::Template(template) => template.render(value),
        }
    }

    /// Whether this output renders through a template.
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(format) => write!(f, "format: {format}"),
            Self::Template(template) => write!(f, "template: {}", template.name()),
        }
    }
}
