use std::collections::BTreeMap;
use std::path::Path;

use proptest::prelude::*;
use regolith_fs::recycled::{SyncOptions, sync};
use regolith_fs::state::sha256_state;
use regolith_fs::{RevertibleFsOperations, State};
use regolith_test_utils::{build_tree, snapshot};
use tempfile::tempdir;

/// Small path alphabet so that generated trees overlap and collide.
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    let segment = prop::sample::select(vec!["a", "b", "c.txt", "d.json"]);
    let path = prop::collection::vec(segment, 1..4).prop_map(|parts| parts.join("/"));
    let content = prop::sample::select(vec!["x", "y", "z"]).prop_map(str::to_string);
    prop::collection::btree_map(path, content, 0..8)
}

/// Drop paths that would need a file and a directory at the same location.
fn materialize(root: &Path, tree: &BTreeMap<String, String>) {
    let mut files: Vec<(&str, &str)> = Vec::new();
    for (path, content) in tree {
        let clashes = tree.keys().any(|other| {
            other != path && (other.starts_with(&format!("{path}/")) || path.starts_with(&format!("{other}/")))
        });
        if !clashes {
            files.push((path.as_str(), content.as_str()));
        }
    }
    build_tree(root, &files);
}

#[derive(Debug, Clone)]
enum Op {
    Delete(String),
    Move(String, String),
    Copy(String, String),
    MkdirAll(String),
    DeleteDir(String),
    MoveOrCopyDir(String, String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let name = prop::sample::select(vec!["a", "b", "c.txt", "a/b", "new", "new/deep"]).prop_map(str::to_string);
    // Copying a directory into itself never terminates
    let pair = (name.clone(), name.clone())
        .prop_filter("target inside source", |(a, b)| !b.starts_with(&format!("{a}/")));
    prop_oneof![
        name.clone().prop_map(Op::Delete),
        pair.clone().prop_map(|(a, b)| Op::Move(a, b)),
        pair.clone().prop_map(|(a, b)| Op::Copy(a, b)),
        name.clone().prop_map(Op::MkdirAll),
        name.prop_map(Op::DeleteDir),
        pair.prop_map(|(a, b)| Op::MoveOrCopyDir(a, b)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sync_converges(source_tree in tree_strategy(), target_tree in tree_strategy(), can_move in any::<bool>()) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        materialize(&source, &source_tree);
        materialize(&target, &target_tree);
        let expected = snapshot(&source);

        let mut source_state = sha256_state(&source).unwrap();
        let mut target_state = sha256_state(&target).unwrap();
        let expected_state = source_state.clone();
        sync(&source, &mut source_state, &target, &mut target_state, SyncOptions { can_move }).unwrap();

        prop_assert_eq!(snapshot(&target), expected);
        prop_assert_eq!(&target_state, &expected_state);
        prop_assert_eq!(target_state, sha256_state(&target).unwrap());
    }

    #[test]
    fn undo_restores_any_prefix(tree in tree_strategy(), ops in prop::collection::vec(op_strategy(), 0..8)) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        materialize(&root, &tree);
        std::fs::create_dir_all(&root).unwrap();
        let before = snapshot(&root);

        let mut revertible = RevertibleFsOperations::new(dir.path().join("backup")).unwrap();
        for op in &ops {
            // Rejected operations (missing source, existing target) must leave no trace
            let _ = match op {
                Op::Delete(p) => revertible.delete(&root.join(p)),
                Op::Move(a, b) => revertible.move_path(&root.join(a), &root.join(b)),
                Op::Copy(a, b) => revertible.copy(&root.join(a), &root.join(b)),
                Op::MkdirAll(p) => revertible.mkdir_all(&root.join(p)),
                Op::DeleteDir(p) => revertible.delete_dir(&root.join(p)),
                Op::MoveOrCopyDir(a, b) if root.join(a).is_dir() => {
                    revertible.move_or_copy_dir(&root.join(a), &root.join(b))
                }
                Op::MoveOrCopyDir(..) => Ok(()),
            };
        }
        revertible.undo().unwrap();
        revertible.close().unwrap();

        prop_assert_eq!(snapshot(&root), before);
    }
}

#[test]
fn empty_states_sync_to_empty_target() {
    let dir = tempdir().unwrap();
    let mut source_state = State::default();
    let mut target_state = State::default();
    let report = sync(
        &dir.path().join("missing"),
        &mut source_state,
        &dir.path().join("also_missing"),
        &mut target_state,
        SyncOptions::copying(),
    )
    .unwrap();
    assert_eq!(report.operations(), 0);
}
