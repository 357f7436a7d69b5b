//! Runs against the checked-in projects under `test-fixtures/projects`.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use regolith_core::{Config, RunContext, RunSettings, SystemGameDirectories, run_profile};
use regolith_fs::io::copy_recursive;
use regolith_test_utils::snapshot;
use rstest::rstest;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures/projects")
}

/// Copy a fixture project into a temporary directory.
fn fixture(name: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    copy_recursive(&fixtures_dir().join(name), &temp.path().join(name)).unwrap();
    temp
}

#[rstest]
#[case("default")]
#[case("nested")]
fn basic_project_exports_its_packs(#[case] profile: &str) {
    let temp = fixture("basic");
    let root = temp.path().join("basic");

    let config = Config::load(&root).unwrap();
    let dot_regolith = root.join(".regolith");
    let settings = RunSettings::default();
    let ctx = RunContext::new(profile, &config, &dot_regolith, &settings, &SystemGameDirectories);
    run_profile(&ctx).unwrap();

    assert_eq!(snapshot(&root.join("build/BP")), snapshot(&root.join("packs/BP")));
    assert_eq!(snapshot(&root.join("build/RP")), snapshot(&root.join("packs/RP")));
    assert_eq!(
        snapshot(&root.join("packs/data")),
        snapshot(&fixtures_dir().join("basic/packs/data"))
    );
}

#[test]
fn basic_project_config() {
    let config = Config::load(&fixtures_dir().join("basic")).unwrap();

    assert_eq!(config.name, "basic");
    assert_eq!(config.profiles.len(), 2);
    assert_eq!(config.profiles["default"].filters.len(), 2);
    assert!(config.data_path.ends_with("packs/data"));
}
