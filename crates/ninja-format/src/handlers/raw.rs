//! Raw text handler
//!
//! Raw sources are wrapped as `{"content": <text>}` so templates can address
//! them; rendering unwraps the same shape.

use serde_json::Map;

use crate::error::{Error, Result};
use crate::format::{Format, FormatHandler};
use crate::Value;

/// Key holding the text of a raw document
pub const CONTENT_KEY: &str = "content";

/// Handler passing text through unchanged
#[derive(Debug, Default)]
pub struct RawHandler;

impl FormatHandler for RawHandler {
    fn format(&self) -> Format {
        Format::Raw
    }

    fn parse(&self, source: &str) -> Result<Value> {
        let mut map = Map::new();
        map.insert(CONTENT_KEY.to_string(), Value::String(source.to_string()));
        Ok(Value::Object(map))
    }

    fn render(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Object(map) => match map.get(CONTENT_KEY) {
                Some(Value::String(text)) => Ok(text.clone()),
                Some(_) => Err(Error::encode(
                    Format::Raw,
                    format!("'{CONTENT_KEY}' must be a string"),
                )),
                None => Err(Error::encode(
                    Format::Raw,
                    format!("mapping has no '{CONTENT_KEY}' key"),
                )),
            },
            _ => Err(Error::encode(
                Format::Raw,
                "expected a string or a mapping with a 'content' key",
            )),
        }
    }
}
