//! Validated object definitions
//!
//! [`ObjectSpec`] is the checked form of one settings entry. Validation runs
//! once at startup; everything downstream trusts these values.

use std::path::PathBuf;

use ninja_backend::{Construction, Params};
use ninja_format::Format;

use crate::error::{Error, Result};
use crate::settings::{Kwargs, ObjectConfig};

/// Where an object's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Registry tag of the backend
    pub backend: String,
    /// Format of the backend's content
    pub format: Format,
    /// Identifier or friendly-name construction
    pub construction: Construction,
}

/// How a destination renders values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    Format(Format),
    Template(PathBuf),
}

/// Where an object's rendered content goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestSpec {
    pub path: PathBuf,
    pub output: OutputSpec,
}

/// One managed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub key: String,
    pub source: SourceSpec,
    pub dest: DestSpec,
    /// Hooks run, in order, after each write
    pub hooks: Vec<String>,
}

fn to_params(kwargs: &Kwargs) -> Params {
    kwargs
        .kwargs
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}

impl ObjectSpec {
    /// Validate one settings entry.
    pub fn from_config(key: &str, config: &ObjectConfig) -> Result<Self> {
        let invalid = |message: String| Error::configuration(key, message);

        let format: Format = config
            .source
            .format
            .parse()
            .map_err(|e: ninja_format::Error| invalid(format!("source: {e}")))?;

        // Friendly names win when both are given.
        let construction = match (&config.source.init, &config.source.new) {
            (_, Some(new)) => {
                if config.source.init.is_some() {
                    tracing::debug!(key, "Both 'init' and 'new' given, using 'new'");
                }
                Construction::Names(to_params(new))
            }
            (Some(init), None) => Construction::Identifiers(to_params(init)),
            (None, None) => {
                return Err(invalid(
                    "source needs either 'init' or 'new' arguments".to_string(),
                ));
            }
        };

        if config.source.backend.trim().is_empty() {
            return Err(invalid("source backend is empty".to_string()));
        }
        if config.dest.path.as_os_str().is_empty() {
            return Err(invalid("dest path is empty".to_string()));
        }

        let output = if Format::is_tag(&config.dest.format) {
            OutputSpec::Format(
                config
                    .dest
                    .format
                    .parse()
                    .map_err(|e: ninja_format::Error| invalid(format!("dest: {e}")))?,
            )
        } else {
            let template = PathBuf::from(&config.dest.format);
            if !template.is_file() {
                return Err(invalid(format!(
                    "dest format '{}' is neither a known format nor an existing template",
                    config.dest.format
                )));
            }
            OutputSpec::Template(template)
        };

        Ok(Self {
            key: key.to_string(),
            source: SourceSpec {
                backend: config.source.backend.clone(),
                format,
                construction,
            },
            dest: DestSpec {
                path: config.dest.path.clone(),
                output,
            },
            hooks: config.hooks.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DestConfig, ParamValue, SourceConfig};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kwargs(pairs: &[(&str, &str)]) -> Kwargs {
        Kwargs {
            kwargs: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), ParamValue::String(v.to_string())))
                .collect(),
        }
    }

    fn config(init: Option<Kwargs>, new: Option<Kwargs>, dest_format: &str) -> ObjectConfig {
        ObjectConfig {
            source: SourceConfig {
                backend: "local".into(),
                format: "yaml".into(),
                init,
                new,
            },
            dest: DestConfig {
                path: PathBuf::from("out.json"),
                format: dest_format.into(),
            },
            hooks: vec![],
        }
    }

    #[test]
    fn init_builds_identifier_construction() {
        let spec = ObjectSpec::from_config(
            "obj",
            &config(Some(kwargs(&[("path", "in.yaml")])), None, "json"),
        )
        .unwrap();

        assert_eq!(
            spec.source.construction,
            Construction::Identifiers(Params::new().with("path", "in.yaml"))
        );
        assert_eq!(spec.dest.output, OutputSpec::Format(Format::Json));
    }

    #[test]
    fn new_wins_over_init() {
        let spec = ObjectSpec::from_config(
            "obj",
            &config(
                Some(kwargs(&[("application_id", "a")])),
                Some(kwargs(&[("application_name", "web")])),
                "json",
            ),
        )
        .unwrap();

        assert!(matches!(spec.source.construction, Construction::Names(_)));
    }

    #[test]
    fn missing_construction_is_rejected() {
        let err = ObjectSpec::from_config("obj", &config(None, None, "json")).unwrap_err();
        assert!(err.to_string().contains("'init' or 'new'"));
    }

    #[rstest]
    #[case("yml")]
    #[case("toml")]
    #[case("raw")]
    fn format_tags_are_formats(#[case] tag: &str) {
        let spec = ObjectSpec::from_config(
            "obj",
            &config(Some(kwargs(&[("path", "x")])), None, tag),
        )
        .unwrap();
        assert!(matches!(spec.dest.output, OutputSpec::Format(_)));
    }

    #[test]
    fn missing_template_is_rejected() {
        let err = ObjectSpec::from_config(
            "obj",
            &config(Some(kwargs(&[("path", "x")])), None, "/no/such/template.j2"),
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("template"));
    }

    #[test]
    fn existing_template_is_accepted() {
        let dir = tempfile::TempDir::new().unwrap();
        let template = dir.path().join("out.j2");
        std::fs::write(&template, "{{ a }}").unwrap();

        let spec = ObjectSpec::from_config(
            "obj",
            &config(Some(kwargs(&[("path", "x")])), None, template.to_str().unwrap()),
        )
        .unwrap();
        assert_eq!(spec.dest.output, OutputSpec::Template(template));
    }

    #[test]
    fn unknown_source_format_is_rejected() {
        let mut cfg = config(Some(kwargs(&[("path", "x")])), None, "json");
        cfg.source.format = "ini".into();
        let err = ObjectSpec::from_config("obj", &cfg).unwrap_err();
        assert!(err.to_string().contains("ini"));
    }
}
