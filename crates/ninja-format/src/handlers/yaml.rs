//! YAML format handler using serde_yaml

use serde_json::Map;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Position, Result};
use crate::format::{Format, FormatHandler};
use crate::Value;

/// Handler for YAML documents
#[derive(Debug, Default)]
pub struct YamlHandler;

impl FormatHandler for YamlHandler {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn parse(&self, source: &str) -> Result<Value> {
        let yaml: YamlValue = serde_yaml::from_str(source).map_err(|e| {
            let position = e.location().map(|loc| Position {
                line: Some(loc.line()),
                column: Some(loc.column()),
                offset: Some(loc.index()),
            });
            Error::decode(Format::Yaml, e.to_string(), position)
        })?;
        yaml_to_json(yaml)
    }

    fn render(&self, value: &Value) -> Result<String> {
        serde_yaml::to_string(value).map_err(|e| Error::encode(Format::Yaml, e.to_string()))
    }
}

/// Convert a YAML value into the JSON data model.
///
/// Scalar mapping keys are stringified; tags are dropped.
fn yaml_to_json(value: YamlValue) -> Result<Value> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        Error::decode(Format::Yaml, format!("non-finite number {n}"), None)
                    })?
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(key_to_string(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn key_to_string(key: YamlValue) -> Result<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Err(Error::decode(
            Format::Yaml,
            "mapping keys must be scalars",
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_nested_document() {
        let value = YamlHandler
            .parse("a: 1\nb:\n  - x\n  - true\nc:\n  d: 1.5\n")
            .unwrap();
        assert_eq!(value, json!({"a": 1, "b": ["x", true], "c": {"d": 1.5}}));
    }

    #[test]
    fn parse_stringifies_scalar_keys() {
        let value = YamlHandler.parse("1: one\ntrue: yes\n").unwrap();
        assert_eq!(value, json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn parse_rejects_complex_keys() {
        assert!(YamlHandler.parse("? [a, b]\n: value\n").is_err());
    }

    #[test]
    fn parse_error_has_location() {
        let err = YamlHandler.parse("a: 1\nb: [unclosed\n").unwrap_err();
        match err {
            Error::Decode { position, .. } => assert!(position.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn render_simple_mapping() {
        assert_eq!(YamlHandler.render(&json!({"a": 1})).unwrap(), "a: 1\n");
    }
}
