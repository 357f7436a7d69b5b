//! Record of the files Regolith wrote to each export target
//!
//! Before an export overwrites a pack directory, every file inside it must
//! be one that an earlier export put there. Anything else was made by the
//! user and the export refuses to run. The record is stored as
//!
//! ```json
//! { "rp": { "/abs/rp/target": ["manifest.json", "textures/a.png"] }, "bp": { } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::io::walk_error;
use crate::path::NormalizedPath;
use crate::{Error, Result, io};

/// Files written per export path, split by pack type.
///
/// Lists are sorted byte-wise so they can be compared against a sorted
/// directory listing with a single forward pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedFiles {
    #[serde(default)]
    pub rp: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub bp: BTreeMap<String, Vec<String>>,
}

impl EditedFiles {
    /// Load the record. A missing or corrupt file gives an empty record.
    pub fn load(cache_file: &Path) -> Self {
        let content = match fs::read_to_string(cache_file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("could not read {}: {}; starting a new record", cache_file.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("corrupt edited files record {}: {}; starting a new record", cache_file.display(), e);
                Self::default()
            }
        }
    }

    /// Persist the record, creating parent directories as needed.
    pub fn dump(&self, cache_file: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| Error::CacheSerialize {
            path: cache_file.to_path_buf(),
            message: e.to_string(),
        })?;
        io::write_atomic(cache_file, content.as_bytes())
    }

    /// Fail if either target contains a file this record doesn't list.
    ///
    /// Targets that don't exist are safe. Nothing is modified.
    pub fn check_deletion_safety(&self, rp_path: &Path, bp_path: &Path) -> Result<()> {
        check_path(rp_path, tracked(&self.rp, rp_path))?;
        check_path(bp_path, tracked(&self.bp, bp_path))
    }

    /// Replace the lists for both targets with their current file listings.
    pub fn update_from_paths(&mut self, rp_path: &Path, bp_path: &Path) -> Result<()> {
        self.rp.insert(key(rp_path), list_files(rp_path)?);
        self.bp.insert(key(bp_path), list_files(bp_path)?);
        Ok(())
    }
}

fn key(path: &Path) -> String {
    NormalizedPath::new(path).as_str().to_string()
}

fn tracked<'a>(map: &'a BTreeMap<String, Vec<String>>, path: &Path) -> &'a [String] {
    map.get(&key(path)).map(Vec::as_slice).unwrap_or(&[])
}

fn check_path(target: &Path, known: &[String]) -> Result<()> {
    let files = list_files(target)?;
    let mut idx = 0;
    for file in files {
        while idx < known.len() && known[idx] < file {
            idx += 1;
        }
        if known.get(idx) != Some(&file) {
            return Err(Error::UnsafeToDelete {
                target: target.to_path_buf(),
                file,
            });
        }
        idx += 1;
    }
    Ok(())
}

/// Sorted forward-slash paths of every file under `root`. Empty when
/// `root` is missing.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Some(rel) = NormalizedPath::relative(root, entry.path()) {
            files.push(rel.as_str().to_string());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = crate::path::join_relative(root, rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn listing_is_bytewise_sorted() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/b.txt", "1");
        write(dir.path(), "a.txt", "2");
        write(dir.path(), "B.txt", "3");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        assert_eq!(list_files(dir.path()).unwrap(), vec!["B.txt", "a.txt", "a/b.txt"]);
    }

    #[test]
    fn tracked_subset_is_safe() {
        let dir = tempdir().unwrap();
        let rp = dir.path().join("rp");
        write(&rp, "a.txt", "1");
        let mut files = EditedFiles::default();
        files.rp.insert(key(&rp), vec!["a.txt".into(), "gone.txt".into()]);

        files.check_deletion_safety(&rp, &dir.path().join("bp")).unwrap();
    }

    #[test]
    fn untracked_file_is_reported() {
        let dir = tempdir().unwrap();
        let bp = dir.path().join("bp");
        write(&bp, "a.txt", "1");
        write(&bp, "user.txt", "mine");
        let mut files = EditedFiles::default();
        files.bp.insert(key(&bp), vec!["a.txt".into()]);

        let err = files
            .check_deletion_safety(&dir.path().join("rp"), &bp)
            .unwrap_err();
        match err {
            Error::UnsafeToDelete { file, .. } => assert_eq!(file, "user.txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn corrupt_record_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edited_files.json");
        fs::write(&path, "[1, 2").unwrap();
        assert_eq!(EditedFiles::load(&path), EditedFiles::default());
    }
}
