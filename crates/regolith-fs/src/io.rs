//! Low-level file helpers shared by the revertible operations, the
//! synchronizer and the cache files

use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock to prevent concurrent access.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Remove a file or a whole directory tree. Missing paths, including paths
/// below a file, are not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if is_absent(&e) => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if is_absent(&e) => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn is_absent(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

/// Recursively copy `source` into `target`, creating `target` if needed.
///
/// Works for a single file as well as for a directory tree. Empty
/// directories are reproduced.
pub fn copy_recursive(source: &Path, target: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
    if !metadata.is_dir() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::copy(source, target).map_err(|e| Error::io(source, e))?;
        return Ok(());
    }

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .unwrap_or_else(|_| Path::new(""));
        let destination = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;
        } else {
            fs::copy(entry.path(), &destination).map_err(|e| Error::io(entry.path(), e))?;
        }
    }
    Ok(())
}

/// Rename `source` to `target`, falling back to copy + remove when the
/// rename fails (for example across devices).
pub fn force_move(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                "rename {} -> {} failed ({}), falling back to copy",
                source.display(),
                target.display(),
                rename_err
            );
            copy_recursive(source, target)?;
            remove_path(source)
        }
    }
}

/// True when `path` is missing or an empty directory.
pub fn is_empty_or_missing(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Convert a walkdir error into an [`Error::Io`] at the failing path.
pub(crate) fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        write_atomic(&path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn remove_path_ignores_missing() {
        let dir = tempdir().unwrap();
        remove_path(&dir.path().join("nope")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_path_below_a_file_is_absent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b"), "file").unwrap();
        remove_path(&dir.path().join("b/c.txt")).unwrap();
        assert!(dir.path().join("b").is_file());
    }

    #[test]
    fn copy_recursive_keeps_empty_directories() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("empty")).unwrap();
        fs::create_dir_all(source.join("full")).unwrap();
        fs::write(source.join("full").join("f.txt"), "x").unwrap();

        let target = dir.path().join("target");
        copy_recursive(&source, &target).unwrap();

        assert!(target.join("empty").is_dir());
        assert_eq!(fs::read_to_string(target.join("full/f.txt")).unwrap(), "x");
    }

    #[test]
    fn empty_or_missing() {
        let dir = tempdir().unwrap();
        assert!(is_empty_or_missing(&dir.path().join("missing")).unwrap());
        assert!(is_empty_or_missing(dir.path()).unwrap());
        fs::write(dir.path().join("f"), "").unwrap();
        assert!(!is_empty_or_missing(dir.path()).unwrap());
    }
}
