//! Jinja templates as a destination format
//!
//! Templates are loaded once, when the owning object is built. Rendering is
//! strict: any reference to an undefined value fails instead of producing an
//! empty string, and nothing is auto-escaped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};

use crate::error::{Error, Result};
use crate::Value;

/// Functions minijinja resolves without a context entry
const BUILTIN_GLOBALS: &[&str] = &["range", "dict", "debug", "namespace", "loop", "self"];

/// A loaded template bound to its source path.
pub struct Template {
    name: String,
    path: PathBuf,
    env: Environment<'static>,
}

impl Template {
    /// Load and compile the template at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path).map_err(|e| Error::TemplateLoad {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.add_template_owned(name.clone(), source)
            .map_err(|e| Error::TemplateLoad {
                path: path.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(template = %name, path = %path.display(), "loaded template");
        Ok(Self { name, path, env })
    }

    /// Template file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the template was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the template with the value's top-level keys as the context.
    pub fn render(&self, value: &Value) -> Result<String> {
        let template = self.env.get_template(&self.name).map_err(|e| self.render_error(None, &e))?;
        let ctx = minijinja::Value::from_serialize(value);

        template.render(ctx).map_err(|e| {
            let missing = if e.kind() == ErrorKind::UndefinedError {
                first_missing(template.undeclared_variables(true), value)
            } else {
                None
            };
            self.render_error(missing, &e)
        })
    }

    fn render_error(&self, missing: Option<String>, err: &minijinja::Error) -> Error {
        let mut message = match &missing {
            Some(name) => format!("undefined reference '{name}'"),
            None => err.to_string(),
        };
        if let Some(line) = err.line() {
            message.push_str(&format!(" (line {line})"));
        }
        Error::TemplateRender {
            template: self.name.clone(),
            missing,
            message,
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Find the first dotted reference that does not resolve against `value`.
fn first_missing(
    references: impl IntoIterator<Item = String>,
    value: &Value,
) -> Option<String> {
    let mut references: Vec<String> = references.into_iter().collect();
    references.sort();

    references.into_iter().find(|reference| {
        let mut segments = reference.split('.');
        let Some(root) = segments.next() else {
            return false;
        };
        if BUILTIN_GLOBALS.contains(&root) {
            return false;
        }
        let mut current = match value.get(root) {
            Some(v) => v,
            None => return true,
        };
        for segment in segments {
            match current {
                Value::Object(map) => match map.get(segment) {
                    Some(next) => current = next,
                    None => return true,
                },
                // Attribute access on a non-mapping is minijinja's call to make
                _ => return false,
            }
        }
        false
    })
}
