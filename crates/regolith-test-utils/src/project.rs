//! [`TestProject`] builder for orchestration tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::tree::build_tree;

/// A temporary Regolith project: `config.json` plus `packs/{BP,RP,data}`.
///
/// # Example
///
/// ```rust,no_run
/// use regolith_test_utils::TestProject;
///
/// let project = TestProject::new("demo")
///     .with_rp(&[("manifest.json", "{}")])
///     .with_profile("default", serde_json::json!({
///         "export": { "target": "local" },
///         "filters": []
///     }));
/// project.write_config();
/// ```
pub struct TestProject {
    temp_dir: TempDir,
    config: Value,
}

impl TestProject {
    /// Create a project with empty packs and no profiles.
    pub fn new(name: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        for pack in ["BP", "RP", "data"] {
            fs::create_dir_all(temp_dir.path().join("packs").join(pack)).unwrap();
        }
        let config = json!({
            "name": name,
            "author": "tests",
            "packs": {
                "behaviorPack": "./packs/BP",
                "resourcePack": "./packs/RP"
            },
            "regolith": {
                "dataPath": "./packs/data",
                "filterDefinitions": {},
                "profiles": {}
            }
        });
        Self { temp_dir, config }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn with_bp(self, files: &[(&str, &str)]) -> Self {
        build_tree(&self.path("packs/BP"), files);
        self
    }

    pub fn with_rp(self, files: &[(&str, &str)]) -> Self {
        build_tree(&self.path("packs/RP"), files);
        self
    }

    pub fn with_data(self, files: &[(&str, &str)]) -> Self {
        build_tree(&self.path("packs/data"), files);
        self
    }

    /// Write arbitrary files relative to the project root.
    pub fn with_files(self, files: &[(&str, &str)]) -> Self {
        build_tree(self.root(), files);
        self
    }

    pub fn with_filter_definition(mut self, id: &str, definition: Value) -> Self {
        self.config["regolith"]["filterDefinitions"][id] = definition;
        self
    }

    pub fn with_profile(mut self, name: &str, profile: Value) -> Self {
        self.config["regolith"]["profiles"][name] = profile;
        self
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Write `config.json` to the project root.
    pub fn write_config(&self) {
        let content = serde_json::to_string_pretty(&self.config).unwrap();
        fs::write(self.path("config.json"), content).unwrap();
    }
}
