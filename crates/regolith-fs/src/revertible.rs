//! Filesystem operations that can be rolled back as a batch
//!
//! Every mutating call records its inverse on an undo stack. Deleted paths
//! are not destroyed, they are moved into a private backup directory so the
//! inverse can move them back. [`RevertibleFsOperations::undo`] replays the
//! inverses newest-first; [`RevertibleFsOperations::close`] commits the batch
//! by deleting the backup directory.
//!
//! An instance is not synchronized. One thread owns it for the whole batch.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::io::{copy_recursive, force_move, is_empty_or_missing, remove_path, walk_error};
use crate::{Error, Result};

/// Inverse of a recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
enum UndoAction {
    /// Move `from` back to `to` (inverse of a delete or a move)
    MoveBack { from: PathBuf, to: PathBuf },
    /// Remove a file or tree that the batch created
    Remove(PathBuf),
    /// Recreate an empty directory that the batch removed
    CreateDir(PathBuf),
}

impl UndoAction {
    fn apply(&self) -> Result<()> {
        match self {
            Self::MoveBack { from, to } => force_move(from, to),
            Self::Remove(path) => remove_path(path),
            Self::CreateDir(path) => match fs::create_dir(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
                Err(e) => Err(Error::io(path, e)),
            },
        }
    }
}

/// A batch of undoable filesystem operations.
#[derive(Debug)]
pub struct RevertibleFsOperations {
    undo_stack: Vec<UndoAction>,
    backup_dir: PathBuf,
    backup_counter: u64,
    rename: fn(&Path, &Path) -> std::io::Result<()>,
}

impl RevertibleFsOperations {
    /// Start a new batch that keeps deleted content under `backup_dir`.
    ///
    /// # Errors
    ///
    /// Fails if `backup_dir` exists and is not empty, or cannot be created.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let backup_dir = backup_dir.into();
        if !is_empty_or_missing(&backup_dir)? {
            return Err(Error::BackupDirNotEmpty { path: backup_dir });
        }
        fs::create_dir_all(&backup_dir).map_err(|e| Error::io(&backup_dir, e))?;
        Ok(Self {
            undo_stack: Vec::new(),
            backup_dir,
            backup_counter: 0,
            rename: rename_path,
        })
    }

    /// Directory holding the content deleted by this batch
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Number of recorded, not yet undone steps
    pub fn pending(&self) -> usize {
        self.undo_stack.len()
    }

    fn next_backup_path(&mut self) -> PathBuf {
        self.backup_counter += 1;
        self.backup_dir.join(self.backup_counter.to_string())
    }

    /// Delete a file or directory by moving it into the backup directory.
    ///
    /// Deleting a path that does not exist succeeds and records nothing.
    pub fn delete(&mut self, path: &Path) -> Result<()> {
        if !exists(path)? {
            return Ok(());
        }
        let backup = self.next_backup_path();
        force_move(path, &backup)?;
        self.undo_stack.push(UndoAction::MoveBack {
            from: backup,
            to: path.to_path_buf(),
        });
        Ok(())
    }

    /// Delete a directory tree leaf-first.
    ///
    /// Files are deleted individually and every directory is removed only
    /// after its contents, so a failure part way leaves a stack that can
    /// restore everything already removed.
    pub fn delete_dir(&mut self, path: &Path) -> Result<()> {
        if !exists(path)? {
            return Ok(());
        }
        let entries = collect_post_order(path)?;
        for (entry_path, is_dir) in entries {
            if is_dir {
                fs::remove_dir(&entry_path).map_err(|e| Error::io(&entry_path, e))?;
                self.undo_stack.push(UndoAction::CreateDir(entry_path));
            } else {
                self.delete(&entry_path)?;
            }
        }
        Ok(())
    }

    /// Rename `source` to `target`. The target must not exist.
    pub fn move_path(&mut self, source: &Path, target: &Path) -> Result<()> {
        check_source_and_target(source, target)?;
        (self.rename)(source, target).map_err(|e| Error::io(source, e))?;
        self.undo_stack.push(UndoAction::MoveBack {
            from: target.to_path_buf(),
            to: source.to_path_buf(),
        });
        Ok(())
    }

    /// Copy a file or directory tree to `target`. The target must not exist.
    pub fn copy(&mut self, source: &Path, target: &Path) -> Result<()> {
        check_source_and_target(source, target)?;
        if let Some(parent) = target.parent() {
            self.mkdir_all(parent)?;
        }
        // Recorded first so a half-written copy is also removed by undo
        self.undo_stack.push(UndoAction::Remove(target.to_path_buf()));
        copy_recursive(source, target)
    }

    /// Move `source` to `target`, falling back to copy-then-delete when the
    /// rename is not possible (for example across devices).
    pub fn move_or_copy(&mut self, source: &Path, target: &Path) -> Result<()> {
        match self.move_path(source, target) {
            Ok(()) => Ok(()),
            Err(Error::Io { .. }) => {
                self.copy(source, target)?;
                self.delete(source)
            }
            Err(e) => Err(e),
        }
    }

    /// Create `path` and its missing ancestors.
    ///
    /// The undo step removes only the outermost directory that did not exist
    /// before, so pre-existing directories are never touched.
    pub fn mkdir_all(&mut self, path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        let first_missing = path
            .ancestors()
            .take_while(|a| !a.as_os_str().is_empty() && !a.exists())
            .last()
            .unwrap_or(path)
            .to_path_buf();
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        self.undo_stack.push(UndoAction::Remove(first_missing));
        Ok(())
    }

    /// Move the contents of the `source` tree into `target`.
    ///
    /// `target` must be empty or absent. The source tree is consumed
    /// bottom-up: files are moved (or copied and deleted), then each emptied
    /// source directory is removed.
    pub fn move_or_copy_dir(&mut self, source: &Path, target: &Path) -> Result<()> {
        if !exists(source)? {
            return Err(Error::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        if !is_empty_or_missing(target)? {
            return Err(Error::TargetNotEmpty {
                path: target.to_path_buf(),
            });
        }
        let entries = collect_post_order(source)?;
        for (entry_path, is_dir) in entries {
            let rel = entry_path.strip_prefix(source).unwrap_or_else(|_| Path::new(""));
            let destination = target.join(rel);
            if is_dir {
                self.mkdir_all(&destination)?;
                fs::remove_dir(&entry_path).map_err(|e| Error::io(&entry_path, e))?;
                self.undo_stack.push(UndoAction::CreateDir(entry_path));
            } else {
                if let Some(parent) = destination.parent() {
                    self.mkdir_all(parent)?;
                }
                self.move_or_copy(&entry_path, &destination)?;
            }
        }
        Ok(())
    }

    /// Revert every recorded operation, newest first.
    ///
    /// # Errors
    ///
    /// Stops at the first inverse that fails and reports how far it got. The
    /// failed step stays on the stack, so the filesystem is left partially
    /// reverted and `undo` may be retried.
    pub fn undo(&mut self) -> Result<()> {
        let total = self.undo_stack.len();
        let mut completed = 0;
        while let Some(action) = self.undo_stack.pop() {
            if let Err(e) = action.apply() {
                tracing::error!("undo step {:?} failed: {}", action, e);
                self.undo_stack.push(action);
                return Err(Error::UndoFailed {
                    completed,
                    total,
                    message: e.to_string(),
                });
            }
            completed += 1;
        }
        Ok(())
    }

    /// Commit the batch by deleting the backup directory.
    pub fn close(self) -> Result<()> {
        remove_path(&self.backup_dir)
    }
}

fn rename_path(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::rename(source, target)
}

fn exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn check_source_and_target(source: &Path, target: &Path) -> Result<()> {
    if !exists(source)? {
        return Err(Error::SourceMissing {
            path: source.to_path_buf(),
        });
    }
    if exists(target)? {
        return Err(Error::TargetExists {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Entries of a tree (root included) with children before their parents.
///
/// Collected up front so the walk is not disturbed by the moves it drives.
fn collect_post_order(root: &Path) -> Result<Vec<(PathBuf, bool)>> {
    WalkDir::new(root)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.map_err(|e| walk_error(root, e))?;
            let is_dir = entry.file_type().is_dir();
            Ok((entry.into_path(), is_dir))
        })
        .collect()
}
