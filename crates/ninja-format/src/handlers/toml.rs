//! TOML format handler using the toml crate

use serde_json::Map;

use crate::error::{Error, Position, Result};
use crate::format::{Format, FormatHandler};
use crate::Value;

/// Handler for TOML documents
#[derive(Debug, Default)]
pub struct TomlHandler;

impl FormatHandler for TomlHandler {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn parse(&self, source: &str) -> Result<Value> {
        let table: toml::Table = toml::from_str(source).map_err(|e| {
            let position = e
                .span()
                .map(|span| Position::from_offset(source, span.start));
            Error::decode(Format::Toml, e.message().to_string(), position)
        })?;
        table_to_json(table)
    }

    fn render(&self, value: &Value) -> Result<String> {
        if !value.is_object() {
            return Err(Error::encode(
                Format::Toml,
                "top-level value must be a mapping",
            ));
        }
        toml::to_string_pretty(value).map_err(|e| Error::encode(Format::Toml, e.to_string()))
    }
}

fn table_to_json(table: toml::Table) -> Result<Value> {
    let mut map = Map::new();
    for (key, value) in table {
        map.insert(key, toml_to_json(value)?);
    }
    Ok(Value::Object(map))
}

/// Convert a TOML value into the JSON data model; datetimes become strings.
fn toml_to_json(value: toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| Error::decode(Format::Toml, format!("non-finite float {f}"), None))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        toml::Value::Table(table) => table_to_json(table)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_tables_and_arrays() {
        let value = TomlHandler
            .parse("name = \"svc\"\nports = [80, 443]\n\n[tls]\nenabled = true\n")
            .unwrap();
        assert_eq!(
            value,
            json!({"name": "svc", "ports": [80, 443], "tls": {"enabled": true}})
        );
    }

    #[test]
    fn parse_datetime_as_string() {
        let value = TomlHandler.parse("at = 1979-05-27T07:32:00Z\n").unwrap();
        assert_eq!(value, json!({"at": "1979-05-27T07:32:00Z"}));
    }

    #[test]
    fn parse_error_has_position() {
        let err = TomlHandler.parse("a = 1\nb = \n").unwrap_err();
        match err {
            Error::Decode { position, .. } => {
                assert_eq!(position.and_then(|p| p.line), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_rejects_non_mapping() {
        assert!(matches!(
            TomlHandler.render(&json!([1, 2, 3])),
            Err(Error::Encode { .. })
        ));
    }

    #[test]
    fn render_rejects_null() {
        assert!(matches!(
            TomlHandler.render(&json!({"a": null})),
            Err(Error::Encode { .. })
        ));
    }
}
