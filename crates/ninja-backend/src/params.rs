//! Backend construction parameters

use std::collections::BTreeMap;

use crate::{Error, Result};

/// String parameters handed to a backend factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Look up the first present key among `aliases`.
    pub fn require(&self, backend: &str, aliases: &[&str]) -> Result<&str> {
        aliases
            .iter()
            .find_map(|key| self.get(key))
            .ok_or_else(|| {
                Error::invalid_params(
                    backend,
                    format!(
                        "missing required parameter '{}' (given: {})",
                        aliases.first().copied().unwrap_or_default(),
                        self.keys().join(", ")
                    ),
                )
            })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for Params {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_accepts_aliases() {
        let params = Params::new().with("app_id", "abc");
        assert_eq!(
            params
                .require("appconfig", &["application_id", "app_id"])
                .unwrap(),
            "abc"
        );
    }

    #[test]
    fn require_reports_missing_key() {
        let params = Params::new().with("other", "x");
        let err = params.require("local", &["path"]).unwrap_err();
        assert!(err.to_string().contains("'path'"));
        assert!(err.to_string().contains("other"));
    }
}
