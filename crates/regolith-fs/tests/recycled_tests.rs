//! Recycled sync against real directory trees.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use regolith_fs::recycled::{SyncOptions, sync};
use regolith_fs::state::{deep_copy_and_get_state, sha256_state};
use regolith_fs::{PathHashPair, State};
use regolith_test_utils::{build_tree, files, snapshot, snapshot_mtimes};
use rstest::rstest;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn sync_dirs(source: &Path, target: &Path, options: SyncOptions) -> regolith_fs::recycled::SyncReport {
    let mut source_state = sha256_state(source).unwrap();
    let mut target_state = if target.exists() {
        sha256_state(target).unwrap()
    } else {
        State::default()
    };
    sync(source, &mut source_state, target, &mut target_state, options).unwrap()
}

#[rstest]
#[case::moving(SyncOptions::moving())]
#[case::copying(SyncOptions::copying())]
fn basic_directory_reconciliation(#[case] options: SyncOptions) {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("a.txt", "h1"), ("b/c.txt", "h2")]);
    build_tree(&target, &[("a.txt", "h1"), ("b/d.txt", "h3")]);
    let before = snapshot_mtimes(&target);

    let report = sync_dirs(&source, &target, options);

    assert_eq!(snapshot(&target), files(&[("a.txt", "h1"), ("b/c.txt", "h2")]));
    assert_eq!(report.deleted, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(snapshot_mtimes(&target)["a.txt"], before["a.txt"]);
}

#[test]
fn empty_directory_survives_full_copy() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("empty/", ""), ("x.txt", "x")]);

    let state = deep_copy_and_get_state(&source, &target, &mut Sha256::new()).unwrap();

    assert!(target.join("empty").is_dir());
    assert_eq!(fs::read_dir(target.join("empty")).unwrap().count(), 0);
    assert_eq!(state, sha256_state(&target).unwrap());
}

#[test]
fn empty_directory_survives_sync() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("empty/", ""), ("x.txt", "x")]);
    build_tree(&target, &[("old/file.txt", "old")]);

    sync_dirs(&source, &target, SyncOptions::copying());

    assert_eq!(snapshot(&target), files(&[("empty/", ""), ("x.txt", "x")]));
}

#[test]
fn unchanged_files_are_never_touched() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(
        &source,
        &[("a.txt", "a"), ("nested/b.txt", "b"), ("nested/deep/c.txt", "c")],
    );
    deep_copy_and_get_state(&source, &target, &mut Sha256::new()).unwrap();
    let before = snapshot_mtimes(&target);

    let report = sync_dirs(&source, &target, SyncOptions::moving());

    assert_eq!(report.operations(), 0);
    assert_eq!(report.unchanged, 3);
    assert_eq!(snapshot_mtimes(&target), before);
}

#[test]
fn second_sync_does_nothing() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("a.txt", "a"), ("b/c.txt", "c"), ("d/", "")]);
    build_tree(&target, &[("a.txt", "stale"), ("z.txt", "z")]);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = sha256_state(&target).unwrap();
    let first = sync(&source, &mut source_state, &target, &mut target_state, SyncOptions::copying()).unwrap();
    assert!(first.operations() > 0);

    let second = sync(&source, &mut source_state, &target, &mut target_state, SyncOptions::copying()).unwrap();
    assert_eq!(second.operations(), 0);
}

#[test]
fn moving_sync_empties_source_and_reports_state() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("a.txt", "a"), ("sub/b.txt", "b")]);
    let expected = snapshot(&source);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = State::default();
    let report = sync(&source, &mut source_state, &target, &mut target_state, SyncOptions::moving()).unwrap();

    assert_eq!(report.moved, 2);
    assert_eq!(snapshot(&target), expected);
    assert_eq!(target_state, sha256_state(&target).unwrap());
    assert_eq!(source_state, State::new(vec![PathHashPair::dir("sub")]));
}

#[rstest]
#[case::moving(SyncOptions::moving())]
#[case::copying(SyncOptions::copying())]
fn file_replaced_by_directory_and_back(#[case] options: SyncOptions) {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("a/inner.txt", "dir now"), ("b", "file now")]);
    build_tree(&target, &[("a", "was a file"), ("b/inner.txt", "was a dir")]);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = sha256_state(&target).unwrap();
    sync(&source, &mut source_state, &target, &mut target_state, options).unwrap();

    assert_eq!(
        snapshot(&target),
        files(&[("a/inner.txt", "dir now"), ("b", "file now")])
    );
    assert_eq!(target_state, sha256_state(&target).unwrap());
}

#[rstest]
#[case::moving(SyncOptions::moving())]
#[case::copying(SyncOptions::copying())]
fn file_replaces_nested_directory(#[case] options: SyncOptions) {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("b", "file"), ("b.txt", "sibling")]);
    build_tree(&target, &[("b/c.txt", "c"), ("b/d/e.txt", "e"), ("b/f/", "")]);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = sha256_state(&target).unwrap();
    sync(&source, &mut source_state, &target, &mut target_state, options).unwrap();

    assert_eq!(snapshot(&target), files(&[("b", "file"), ("b.txt", "sibling")]));
    assert_eq!(target_state, sha256_state(&target).unwrap());
}

#[test]
fn directory_with_prefixed_sibling_is_kept() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("b-x", "1"), ("b.txt", "2"), ("b/c.txt", "3")]);
    build_tree(&target, &[("b/", "")]);

    let report = sync_dirs(&source, &target, SyncOptions::copying());

    assert_eq!(report.deleted, 0);
    assert_eq!(
        snapshot(&target),
        files(&[("b-x", "1"), ("b.txt", "2"), ("b/c.txt", "3")])
    );
}

#[test]
fn deletion_beside_prefixed_sibling_keeps_synced_directory() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("b-x", "1"), ("b/keep.txt", "k")]);
    build_tree(&target, &[("b-x", "1"), ("b/keep.txt", "k"), ("b/old/gone.txt", "g")]);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = sha256_state(&target).unwrap();
    sync(&source, &mut source_state, &target, &mut target_state, SyncOptions::copying()).unwrap();

    assert_eq!(snapshot(&target), files(&[("b-x", "1"), ("b/keep.txt", "k")]));
    assert_eq!(target_state, sha256_state(&target).unwrap());
}

#[test]
fn emptied_nested_directories_are_pruned() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    build_tree(&source, &[("keep.txt", "k")]);
    build_tree(&target, &[("keep.txt", "k"), ("x/y/z/gone.txt", "g")]);

    sync_dirs(&source, &target, SyncOptions::copying());

    assert_eq!(snapshot(&target), files(&[("keep.txt", "k")]));
    assert!(!target.join("x").exists());
}

#[test]
fn empty_source_root_empties_target() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source");
    let target = dir.path().join("target");
    fs::create_dir_all(&source).unwrap();
    build_tree(&target, &[("a.txt", "a"), ("b/c.txt", "c")]);

    let mut source_state = sha256_state(&source).unwrap();
    let mut target_state = sha256_state(&target).unwrap();
    sync(&source, &mut source_state, &target, &mut target_state, SyncOptions::moving()).unwrap();

    assert!(target.is_dir());
    assert_eq!(snapshot(&target), files(&[]));
    assert_eq!(target_state, State::new(vec![PathHashPair::dir("")]));
}
