//! Export into a local target and the data write-back.

use std::collections::BTreeSet;
use std::fs;

use pretty_assertions::assert_eq;
use regolith_core::{
    Config, Error, Experiment, RunContext, RunSettings, SystemGameDirectories, clean, run_profile,
};
use regolith_test_utils::{TestProject, files, snapshot, snapshot_mtimes};
use serde_json::json;

fn run(project: &TestProject, settings: &RunSettings) -> regolith_core::Result<()> {
    project.write_config();
    let config = Config::load(project.root())?;
    let dot_regolith = project.root().join(".regolith");
    let ctx = RunContext::new("default", &config, &dot_regolith, settings, &SystemGameDirectories);
    run_profile(&ctx)
}

fn local(project: TestProject) -> TestProject {
    project.with_profile(
        "default",
        json!({ "export": { "target": "local" }, "filters": [] }),
    )
}

fn size_time_check() -> RunSettings {
    RunSettings {
        experiments: BTreeSet::from([Experiment::SizeTimeCheck]),
        ..RunSettings::default()
    }
}

#[test]
fn packs_are_copied_to_the_target() {
    let project = local(
        TestProject::new("demo")
            .with_bp(&[("manifest.json", "bp"), ("entities/", "")])
            .with_rp(&[("textures/a.png", "png")]),
    );

    run(&project, &RunSettings::default()).unwrap();

    assert_eq!(
        snapshot(&project.path("build/BP")),
        files(&[("manifest.json", "bp"), ("entities/", "")])
    );
    assert_eq!(snapshot(&project.path("build/RP")), files(&[("textures/a.png", "png")]));
    assert!(project.path(".regolith/cache/edited_files.json").exists());
    assert!(project.path(".regolith/cache/path_states.json").exists());
}

#[test]
fn second_export_reconciles_changes() {
    let project = local(
        TestProject::new("demo").with_rp(&[("keep.txt", "keep"), ("old.txt", "old"), ("edit.txt", "1")]),
    );
    run(&project, &RunSettings::default()).unwrap();
    let before = snapshot_mtimes(&project.path("build/RP"));

    fs::remove_file(project.path("packs/RP/old.txt")).unwrap();
    fs::write(project.path("packs/RP/edit.txt"), "2").unwrap();
    fs::write(project.path("packs/RP/new.txt"), "new").unwrap();
    run(&project, &RunSettings::default()).unwrap();

    assert_eq!(
        snapshot(&project.path("build/RP")),
        files(&[("keep.txt", "keep"), ("edit.txt", "2"), ("new.txt", "new")])
    );
    let after = snapshot_mtimes(&project.path("build/RP"));
    assert_eq!(before["keep.txt"], after["keep.txt"]);
}

#[test]
fn untracked_files_in_the_target_block_the_export() {
    let project = local(TestProject::new("demo").with_rp(&[("a.txt", "a")]))
        .with_files(&[("build/RP/precious.txt", "mine")]);

    let err = run(&project, &RunSettings::default()).unwrap_err();

    assert!(matches!(err, Error::Export { .. }));
    assert!(matches!(
        err.root_cause(),
        Error::Fs(regolith_fs::Error::UnsafeToDelete { file, .. }) if file == "precious.txt"
    ));
    assert_eq!(snapshot(&project.path("build/RP")), files(&[("precious.txt", "mine")]));
}

#[test]
fn clean_drops_the_workspace_and_export_caches() {
    let project = local(TestProject::new("demo").with_rp(&[("a.txt", "a")]));
    run(&project, &RunSettings::default()).unwrap();

    clean(project.root()).unwrap();

    assert!(!project.path(".regolith/tmp").exists());
    assert!(!project.path(".regolith/cache/edited_files.json").exists());
    assert!(!project.path(".regolith/cache/path_states.json").exists());
    // Exported packs stay
    assert!(project.path("build/RP/a.txt").exists());
    // Without the edited-files record the old export counts as user files
    assert!(run(&project, &RunSettings::default()).is_err());
}

#[test]
fn size_time_check_keeps_the_workspace_between_runs() {
    let project = local(TestProject::new("demo").with_bp(&[("a.txt", "a"), ("b.txt", "b")]));
    let settings = size_time_check();

    run(&project, &settings).unwrap();
    assert!(project.path(".regolith/tmp/BP/a.txt").exists());
    let workspace_before = snapshot_mtimes(&project.path(".regolith/tmp/BP"));

    fs::write(project.path("packs/BP/b.txt"), "changed").unwrap();
    run(&project, &settings).unwrap();

    assert_eq!(
        snapshot(&project.path("build/BP")),
        files(&[("a.txt", "a"), ("b.txt", "changed")])
    );
    let workspace_after = snapshot_mtimes(&project.path(".regolith/tmp/BP"));
    assert_eq!(workspace_before["a.txt"], workspace_after["a.txt"]);
}

#[test]
fn data_is_left_alone_without_export_data() {
    let project = local(TestProject::new("demo").with_data(&[("state.json", "1")]));

    run(&project, &RunSettings::default()).unwrap();

    assert_eq!(snapshot(&project.path("packs/data")), files(&[("state.json", "1")]));
    assert!(!project.path(".regolith/cache/backup").exists());
}

#[cfg(unix)]
mod write_back {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data_filter(export_data: bool) -> TestProject {
        TestProject::new("demo")
            .with_data(&[("state.txt", "1"), ("stale.txt", "x")])
            .with_filter_definition(
                "bump",
                json!({
                    "runWith": "shell",
                    "command": "echo 2 > data/state.txt && rm data/stale.txt",
                    "exportData": export_data
                }),
            )
            .with_profile(
                "default",
                json!({ "export": { "target": "local" }, "filters": [{ "filter": "bump" }] }),
            )
    }

    #[test]
    fn filter_edits_replace_the_project_data() {
        let project = data_filter(true);

        run(&project, &RunSettings::default()).unwrap();

        assert_eq!(snapshot(&project.path("packs/data")), files(&[("state.txt", "2\n")]));
        assert!(!project.path(".regolith/cache/backup").exists());
    }

    #[test]
    fn filter_edits_are_dropped_without_export_data() {
        let project = data_filter(false);

        run(&project, &RunSettings::default()).unwrap();

        assert_eq!(
            snapshot(&project.path("packs/data")),
            files(&[("state.txt", "1"), ("stale.txt", "x")])
        );
    }

    fn disabled_export_data_filter(filters: serde_json::Value) -> TestProject {
        TestProject::new("demo")
            .with_data(&[("state.txt", "1")])
            .with_filter_definition(
                "edit",
                json!({ "runWith": "shell", "command": "echo 2 > data/state.txt" }),
            )
            .with_filter_definition(
                "keep",
                json!({ "runWith": "shell", "command": "true", "exportData": true }),
            )
            .with_profile(
                "nested",
                json!({
                    "export": { "target": "local" },
                    "filters": [{ "filter": "keep", "disabled": true }]
                }),
            )
            .with_profile("default", json!({ "export": { "target": "local" }, "filters": filters }))
    }

    #[test]
    fn disabled_async_child_does_not_request_write_back() {
        let project = disabled_export_data_filter(json!([
            { "filter": "edit" },
            { "asyncFilters": [ { "filter": "keep", "disabled": true } ] }
        ]));

        run(&project, &RunSettings::default()).unwrap();

        assert_eq!(snapshot(&project.path("packs/data")), files(&[("state.txt", "1")]));
    }

    #[test]
    fn disabled_filter_in_nested_profile_does_not_request_write_back() {
        let project = disabled_export_data_filter(json!([
            { "filter": "edit" },
            { "profile": "nested" }
        ]));

        run(&project, &RunSettings::default()).unwrap();

        assert_eq!(snapshot(&project.path("packs/data")), files(&[("state.txt", "1")]));
    }

    #[test]
    fn size_time_check_copies_data_back() {
        let project = data_filter(true);

        run(&project, &size_time_check()).unwrap();

        assert_eq!(snapshot(&project.path("packs/data")), files(&[("state.txt", "2\n")]));
        assert!(project.path(".regolith/tmp/data/state.txt").exists());
    }
}
