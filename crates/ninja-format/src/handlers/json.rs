//! JSON format handler using serde_json

use crate::error::{Error, Position, Result};
use crate::format::{Format, FormatHandler};
use crate::Value;

/// Handler for JSON documents
#[derive(Debug, Default)]
pub struct JsonHandler;

impl FormatHandler for JsonHandler {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, source: &str) -> Result<Value> {
        serde_json::from_str(source).map_err(|e| {
            let position = (e.line() > 0).then(|| Position::line_column(e.line(), e.column()));
            Error::decode(Format::Json, e.to_string(), position)
        })
    }

    fn render(&self, value: &Value) -> Result<String> {
        let mut text = serde_json::to_string_pretty(value)
            .map_err(|e| Error::encode(Format::Json, e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_object() {
        let value = JsonHandler.parse(r#"{"a": 1, "b": [true, null]}"#).unwrap();
        assert_eq!(value, json!({"a": 1, "b": [true, null]}));
    }

    #[test]
    fn parse_error_has_line_and_column() {
        let err = JsonHandler.parse("{\n  \"a\": ,\n}").unwrap_err();
        match err {
            Error::Decode { position, .. } => {
                let position = position.expect("position should be derivable");
                assert_eq!(position.line, Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_is_pretty_with_trailing_newline() {
        let text = JsonHandler.render(&json!({"a": 1})).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }
}
