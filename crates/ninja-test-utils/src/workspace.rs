//! [`TestWorkspace`]: a temporary directory holding settings, sources,
//! templates and destinations.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Scratch directory for end-to-end scenarios.
///
/// # Example
///
/// ```rust,no_run
/// use ninja_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.write("cfg.yaml", "a: 1\n");
/// let settings = ws.settings(&ws.local_object("example", "cfg.yaml", "yaml", "out.json", "json", &[]));
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `rel` inside the workspace.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Read `rel` as text.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, rel: &str) -> String {
        let path = self.path(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Could not read {}: {e}", path.display()))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// YAML for one `local` object; paths are made absolute.
    pub fn local_object(
        &self,
        key: &str,
        source: &str,
        source_format: &str,
        dest: &str,
        dest_format: &str,
        hooks: &[&str],
    ) -> String {
        let hooks = hooks
            .iter()
            .map(|h| format!("\"{h}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "  {key}:\n    source:\n      backend: local\n      format: {source_format}\n      init:\n        kwargs:\n          path: \"{}\"\n    dest:\n      path: \"{}\"\n      format: \"{dest_format}\"\n    hooks: [{hooks}]\n",
            self.path(source).display(),
            self.path(dest).display(),
        )
    }

    /// Write a settings file whose `CONFIG_NINJA_OBJECTS` holds `objects`
    /// (as produced by [`TestWorkspace::local_object`]), followed by `extra`
    /// top-level YAML.
    pub fn settings_with(&self, objects: &str, extra: &str) -> PathBuf {
        let content = format!("CONFIG_NINJA_OBJECTS:\n{objects}{extra}");
        self.write("config-ninja-settings.yaml", &content)
    }

    /// Write a settings file holding `objects`.
    pub fn settings(&self, objects: &str) -> PathBuf {
        self.settings_with(objects, "")
    }

    /// Assert that the file at `rel` has exactly `expected` content.
    ///
    /// # Panics
    /// Panics with both contents if they differ.
    pub fn assert_content(&self, rel: &str, expected: &str) {
        let actual = self.read(rel);
        assert!(
            actual == expected,
            "File {} has unexpected content.\nExpected: {expected:?}\nActual: {actual:?}",
            self.path(rel).display()
        );
    }
}
