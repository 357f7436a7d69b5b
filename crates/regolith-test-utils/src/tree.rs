//! Directory tree fixtures.
//!
//! Trees are described as slices of [`Entry`] and compared as
//! `BTreeMap<String, Entry>` snapshots keyed by forward-slash relative path.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use walkdir::WalkDir;

/// One node of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(Vec<u8>),
    /// A directory with no children.
    EmptyDir,
}

/// Write `files` under `root`. Paths ending in `/` create empty directories.
///
/// # Panics
///
/// Panics on any I/O error; this is test setup.
pub fn build_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel.trim_end_matches('/'));
        if rel.ends_with('/') {
            fs::create_dir_all(&path).unwrap();
        } else {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
    }
}

/// Snapshot every file and empty directory under `root`.
///
/// A missing root snapshots as an empty map.
pub fn snapshot(root: &Path) -> BTreeMap<String, Entry> {
    let mut out = BTreeMap::new();
    if !root.exists() {
        return out;
    }
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let rel = relative(root, entry.path());
        if entry.file_type().is_dir() {
            if fs::read_dir(entry.path()).unwrap().next().is_none() {
                out.insert(rel, Entry::EmptyDir);
            }
        } else {
            out.insert(rel, Entry::File(fs::read(entry.path()).unwrap()));
        }
    }
    out
}

/// Modification times of every file under `root`.
pub fn snapshot_mtimes(root: &Path) -> BTreeMap<String, SystemTime> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let mtime = e.metadata().unwrap().modified().unwrap();
            (relative(root, e.path()), mtime)
        })
        .collect()
}

/// Convenience for building an expected snapshot from literal files.
pub fn files(entries: &[(&str, &str)]) -> BTreeMap<String, Entry> {
    entries
        .iter()
        .map(|(rel, content)| {
            if let Some(dir) = rel.strip_suffix('/') {
                (dir.to_string(), Entry::EmptyDir)
            } else {
                (rel.to_string(), Entry::File(content.as_bytes().to_vec()))
            }
        })
        .collect()
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap()
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
