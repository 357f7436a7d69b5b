//! Sorted content snapshots of directory trees
//!
//! A [`State`] lists every file of a tree as a `(relative path, hash)` pair,
//! sorted byte-wise by path. Non-empty directories are implied by their
//! files and never listed; an empty directory is listed with an empty hash.
//! The root of an empty tree is the empty path.

use serde::{Deserialize, Serialize};
use sha2::Digest;
use sha2::digest::{FixedOutputReset, Output};
use std::fmt::LowerHex;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::checksum::{copy_and_hash, hash_file};
use crate::io::walk_error;
use crate::path::NormalizedPath;
use crate::{Error, Result};

/// One entry of a [`State`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHashPair {
    /// Forward-slash path relative to the tree root
    pub path: String,
    /// Hex content hash; empty for an empty directory
    pub hash: String,
}

impl PathHashPair {
    pub fn file(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: String::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.hash.is_empty()
    }
}

/// Sorted snapshot of a directory tree's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    entries: Vec<PathHashPair>,
}

impl State {
    /// Build a state from unsorted entries. Later duplicates win.
    pub fn new(mut entries: Vec<PathHashPair>) -> Self {
        entries.reverse();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup_by(|later, earlier| later.path == earlier.path);
        Self { entries }
    }

    /// Wrap entries already sorted by path.
    pub(crate) fn from_sorted(entries: Vec<PathHashPair>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].path < w[1].path));
        Self { entries }
    }

    pub fn entries(&self) -> &[PathHashPair] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PathHashPair> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathHashPair> {
        self.entries.iter()
    }

    fn position(&self, path: &str) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|e| e.path.as_str().cmp(path))
    }

    pub fn get(&self, path: &str) -> Option<&PathHashPair> {
        self.position(path).ok().map(|i| &self.entries[i])
    }

    /// Insert at the sorted position, replacing an entry with the same path.
    pub fn insert(&mut self, entry: PathHashPair) {
        match self.position(&entry.path) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<PathHashPair> {
        self.position(path).ok().map(|i| self.entries.remove(i))
    }

    /// Whether the state lists `dir` itself or anything below it.
    pub fn covers(&self, dir: &str) -> bool {
        covers(&self.entries, dir)
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = &'a PathHashPair;
    type IntoIter = std::slice::Iter<'a, PathHashPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Whether sorted `entries` contain `dir` or an entry below it.
///
/// Siblings such as `b-x` or `b.txt` sort between `b` and `b/...`, so the
/// descendants are searched from `dir/` rather than from `dir`.
pub(crate) fn covers(entries: &[PathHashPair], dir: &str) -> bool {
    if dir.is_empty() {
        return !entries.is_empty();
    }
    if entries.binary_search_by(|e| e.path.as_str().cmp(dir)).is_ok() {
        return true;
    }
    let prefix = format!("{dir}/");
    let start = entries.partition_point(|e| e.path.as_str() < prefix.as_str());
    entries.get(start).is_some_and(|e| e.path.starts_with(&prefix))
}

/// Snapshot a directory tree, hashing every file with `hasher`.
///
/// # Errors
///
/// Fails with [`Error::SourceMissing`] when `root` does not exist.
pub fn get_state_from_dir_path<D>(root: &Path, hasher: &mut D) -> Result<State>
where
    D: Digest + FixedOutputReset,
    Output<D>: LowerHex,
{
    if !root.exists() {
        return Err(Error::SourceMissing {
            path: root.to_path_buf(),
        });
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        let rel = relative(root, entry.path());
        if entry.file_type().is_dir() {
            if is_empty_dir(entry.path())? {
                entries.push(PathHashPair::dir(rel));
            }
        } else {
            let hash = hash_file(hasher, entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            entries.push(PathHashPair::file(rel, hash));
        }
    }
    Ok(State::new(entries))
}

/// Copy the `source` tree into `target` and snapshot it in one pass.
///
/// Each file is read once: the bytes are hashed while they are written.
/// The returned state describes both trees.
pub fn deep_copy_and_get_state<D>(source: &Path, target: &Path, hasher: &mut D) -> Result<State>
where
    D: Digest + FixedOutputReset,
    Output<D>: LowerHex,
{
    if !source.exists() {
        return Err(Error::SourceMissing {
            path: source.to_path_buf(),
        });
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let rel = relative(source, entry.path());
        let destination = crate::path::join_relative(target, &rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;
            if is_empty_dir(entry.path())? {
                entries.push(PathHashPair::dir(rel));
            }
        } else {
            let hash = copy_and_hash(hasher, entry.path(), &destination)
                .map_err(|e| Error::io(entry.path(), e))?;
            entries.push(PathHashPair::file(rel, hash));
        }
    }
    Ok(State::new(entries))
}

/// Snapshot with SHA-256, the hash used by the export pipeline.
pub fn sha256_state(root: &Path) -> Result<State> {
    get_state_from_dir_path(root, &mut sha2::Sha256::new())
}

fn relative(root: &Path, path: &Path) -> String {
    NormalizedPath::relative(root, path)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

pub(crate) fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(entries.next().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn new_sorts_bytewise() {
        let state = State::new(vec![
            PathHashPair::file("a/b", "1"),
            PathHashPair::file("a.txt", "2"),
            PathHashPair::file("B", "3"),
        ]);
        let paths: Vec<_> = state.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["B", "a.txt", "a/b"]);
    }

    #[test]
    fn new_keeps_last_duplicate() {
        let state = State::new(vec![
            PathHashPair::file("a", "old"),
            PathHashPair::file("a", "new"),
        ]);
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("a").unwrap().hash, "new");
    }

    #[test]
    fn insert_and_remove_keep_order() {
        let mut state = State::new(vec![PathHashPair::file("a", "1"), PathHashPair::file("c", "3")]);
        state.insert(PathHashPair::file("b", "2"));
        state.insert(PathHashPair::file("c", "4"));
        assert_eq!(
            state.entries(),
            &[
                PathHashPair::file("a", "1"),
                PathHashPair::file("b", "2"),
                PathHashPair::file("c", "4"),
            ]
        );
        assert!(state.remove("a").is_some());
        assert!(state.remove("a").is_none());
    }

    #[test]
    fn covers_checks_descendants() {
        let state = State::new(vec![
            PathHashPair::file("b-x", "1"),
            PathHashPair::file("b/c.txt", "2"),
        ]);
        assert!(state.covers("b"));
        assert!(state.covers(""));
        assert!(!state.covers("c"));
        assert!(!state.covers("b/c"));
    }

    #[test]
    fn covers_sees_past_siblings_sorting_before_the_separator() {
        let state = State::new(vec![
            PathHashPair::file("b.txt", "1"),
            PathHashPair::file("b-x/y", "2"),
            PathHashPair::file("b/deep/c.txt", "3"),
            PathHashPair::dir("e"),
        ]);
        assert!(state.covers("b"));
        assert!(state.covers("b/deep"));
        assert!(state.covers("e"));
        assert!(!state.covers("b/de"));
        assert!(!state.covers("b-"));
        assert!(!State::default().covers(""));
    }

    #[test]
    fn state_lists_files_and_empty_dirs_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("full/inner")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("full/inner/f.txt"), "hello world").unwrap();

        let state = sha256_state(dir.path()).unwrap();
        assert_eq!(
            state.entries(),
            &[
                PathHashPair::dir("empty"),
                PathHashPair::file(
                    "full/inner/f.txt",
                    "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
                ),
            ]
        );
    }

    #[test]
    fn empty_root_is_the_empty_path() {
        let dir = tempdir().unwrap();
        let state = sha256_state(dir.path()).unwrap();
        assert_eq!(state.entries(), &[PathHashPair::dir("")]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let result = sha256_state(&dir.path().join("missing"));
        assert!(matches!(result, Err(Error::SourceMissing { .. })));
    }
}
