//! Settings file discovery, parsing and schema
//!
//! The settings file declares every managed object under
//! `CONFIG_NINJA_OBJECTS`, plus optional hook commands, logging and polling
//! tuning. It is loaded once at startup and passed by reference.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ninja_backend::{BackendOptions, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spec::ObjectSpec;

/// File name searched for in the working and home directories.
pub const SETTINGS_FILE_NAME: &str = "config-ninja-settings.yaml";

/// System-wide settings location.
pub const SYSTEM_SETTINGS_PATH: &str = "/etc/config-ninja/settings.yaml";

/// Locations searched, in order, when no explicit path is given.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(SETTINGS_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(SETTINGS_FILE_NAME));
    }
    paths.push(PathBuf::from(SYSTEM_SETTINGS_PATH));
    paths
}

/// A scalar parameter value; numbers and booleans are accepted and kept as
/// text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Backend constructor arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kwargs {
    #[serde(default)]
    pub kwargs: BTreeMap<String, ParamValue>,
}

/// `source` section of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub backend: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Kwargs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Kwargs>,
}

fn default_format() -> String {
    "raw".to_string()
}

/// `dest` section of an object. `format` is a format tag or a template path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestConfig {
    pub path: PathBuf,
    pub format: String,
}

/// One entry of `CONFIG_NINJA_OBJECTS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub source: SourceConfig,
    pub dest: DestConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,
}

/// Command behind a named hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookCommand {
    /// A command line run through the platform shell
    Shell(String),
    /// A program with explicit arguments
    Program {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
}

impl fmt::Display for HookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => f.write_str(line),
            Self::Program { cmd, args, .. } => {
                f.write_str(cmd)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// `CONFIG_NINJA_LOGGING` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// `CONFIG_NINJA_POLLING` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub local_fallback_secs: u64,
    pub retry_initial_ms: u64,
    pub retry_max_interval_secs: u64,
    pub max_consecutive_failures: u32,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            local_fallback_secs: 2,
            retry_initial_ms: 1000,
            retry_max_interval_secs: 60,
            max_consecutive_failures: 5,
        }
    }
}

impl PollingSettings {
    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            poll_interval: Duration::from_secs(self.interval_secs),
            local_fallback: Duration::from_secs(self.local_fallback_secs.max(1)),
            retry: RetryPolicy {
                initial: Duration::from_millis(self.retry_initial_ms),
                max_interval: Duration::from_secs(self.retry_max_interval_secs),
                max_consecutive_failures: self.max_consecutive_failures.max(1),
            },
        }
    }
}

/// Top-level document of the settings file.
///
/// Unrelated top-level keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "CONFIG_NINJA_OBJECTS", default)]
    pub objects: BTreeMap<String, ObjectConfig>,
    #[serde(rename = "CONFIG_NINJA_HOOKS", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hooks: BTreeMap<String, HookCommand>,
    #[serde(rename = "CONFIG_NINJA_LOGGING", default)]
    pub logging: LoggingSettings,
    #[serde(rename = "CONFIG_NINJA_POLLING", default)]
    pub polling: PollingSettings,
}

/// Syntax of a settings file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Yaml,
    Json,
    Toml,
}

impl Syntax {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Loaded settings together with the file they came from.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    file: SettingsFile,
}

impl Settings {
    pub fn new(path: impl Into<PathBuf>, file: SettingsFile) -> Self {
        Self {
            path: path.into(),
            file,
        }
    }

    /// Load from `explicit` if given, otherwise from the first existing
    /// search path.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let searched = search_paths();
        match searched.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(Error::SettingsNotFound { searched }),
        }
    }

    /// Load and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::SettingsNotFound {
                    searched: vec![path.to_path_buf()],
                }
            } else {
                Error::SettingsRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let settings = Self::parse(path, &content)?;
        tracing::debug!(
            path = %path.display(),
            objects = settings.file.objects.len(),
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Parse settings text; the syntax follows the extension of `path`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let parse_error = |message: String| Error::SettingsParse {
            path: path.clone(),
            message,
        };

        let file = match Syntax::for_path(&path) {
            // An empty YAML document is an empty settings file.
            Syntax::Yaml if content.trim().is_empty() => SettingsFile::default(),
            Syntax::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
            Syntax::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
            Syntax::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &SettingsFile {
        &self.file
    }

    pub fn keys(&self) -> Vec<String> {
        self.file.objects.keys().cloned().collect()
    }

    pub fn hooks(&self) -> &BTreeMap<String, HookCommand> {
        &self.file.hooks
    }

    pub fn logging(&self) -> &LoggingSettings {
        &self.file.logging
    }

    pub fn backend_options(&self) -> BackendOptions {
        self.file.polling.backend_options()
    }

    /// Validate every object definition.
    ///
    /// All problems are collected before failing.
    pub fn objects(&self) -> Result<Vec<ObjectSpec>> {
        let mut specs = Vec::new();
        let mut problems = Vec::new();
        for (key, config) in &self.file.objects {
            match ObjectSpec::from_config(key, config) {
                Ok(spec) => specs.push(spec),
                Err(e) => problems.push(e.to_string()),
            }
        }
        match problems.len() {
            0 => Ok(specs),
            _ => Err(Error::Validation { problems }),
        }
    }

    /// Render the configured objects as YAML.
    pub fn objects_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.file.objects).map_err(|e| Error::SettingsParse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
CONFIG_NINJA_OBJECTS:
  example:
    source:
      backend: local
      format: yaml
      init:
        kwargs:
          path: config.yaml
    dest:
      path: out.json
      format: json
    hooks: [reload]
CONFIG_NINJA_HOOKS:
  reload: echo reloaded
  restart:
    cmd: systemctl
    args: [restart, app]
CONFIG_NINJA_POLLING:
  interval_secs: 30
"#;

    #[test]
    fn parses_yaml_settings() {
        let settings = Settings::parse("settings.yaml", SAMPLE).unwrap();
        let object = &settings.file().objects["example"];

        assert_eq!(object.source.backend, "local");
        assert_eq!(object.hooks, vec!["reload".to_string()]);
        assert_eq!(
            settings.hooks()["reload"],
            HookCommand::Shell("echo reloaded".into())
        );
        assert!(matches!(settings.hooks()["restart"], HookCommand::Program { .. }));
    }

    #[test]
    fn polling_defaults_fill_missing_fields() {
        let settings = Settings::parse("settings.yaml", SAMPLE).unwrap();
        let options = settings.backend_options();

        assert_eq!(options.poll_interval, Duration::from_secs(30));
        assert_eq!(options.local_fallback, Duration::from_secs(2));
        assert_eq!(options.retry.max_consecutive_failures, 5);
    }

    #[test]
    fn source_format_defaults_to_raw() {
        let yaml = r#"
CONFIG_NINJA_OBJECTS:
  plain:
    source: { backend: local, init: { kwargs: { path: a.txt } } }
    dest: { path: b.txt, format: raw }
"#;
        let settings = Settings::parse("s.yml", yaml).unwrap();
        assert_eq!(settings.file().objects["plain"].source.format, "raw");
    }

    #[test]
    fn numeric_kwargs_are_accepted() {
        let yaml = r#"
CONFIG_NINJA_OBJECTS:
  remote:
    source: { backend: appconfig, init: { kwargs: { application_id: 12345 } } }
    dest: { path: b.txt, format: raw }
"#;
        let settings = Settings::parse("s.yaml", yaml).unwrap();
        let init = settings.file().objects["remote"].source.init.clone().unwrap();
        assert_eq!(init.kwargs["application_id"].to_string(), "12345");
    }

    #[test]
    fn parses_toml_by_extension() {
        let toml = r#"
[CONFIG_NINJA_OBJECTS.example.source]
backend = "local"
format = "json"
init = { kwargs = { path = "in.json" } }

[CONFIG_NINJA_OBJECTS.example.dest]
path = "out.yaml"
format = "yaml"
"#;
        let settings = Settings::parse("settings.toml", toml).unwrap();
        assert_eq!(settings.keys(), vec!["example".to_string()]);
    }

    #[test]
    fn malformed_settings_report_path() {
        let err = Settings::parse("bad.yaml", "CONFIG_NINJA_OBJECTS: [").unwrap_err();
        assert!(matches!(err, Error::SettingsParse { ref path, .. } if path == Path::new("bad.yaml")));
    }

    #[test]
    fn empty_file_has_no_objects() {
        let settings = Settings::parse("empty.yaml", "").unwrap();
        assert!(settings.keys().is_empty());
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        let err = Settings::discover(Some(Path::new("/nonexistent/settings.yaml"))).unwrap_err();
        assert!(matches!(err, Error::SettingsNotFound { .. }));
    }

    #[test]
    fn search_paths_end_with_system_location() {
        let paths = search_paths();
        assert_eq!(paths.first().unwrap(), &PathBuf::from("./config-ninja-settings.yaml"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from(SYSTEM_SETTINGS_PATH));
    }
}
