//! Recycled sync: reconcile a target tree with a source tree using their
//! [`State`]s
//!
//! Both states are sorted by path, so the reconciliation is a single merge
//! pass over the two lists:
//!
//! - a path only in the source is copied (or moved) into the target
//! - a path only in the target is deleted from the target
//! - a path in both is rewritten only when the hashes differ
//!
//! Files whose path and hash already match are never touched, which is what
//! makes re-exporting a large, mostly unchanged pack cheap.

use std::fs;
use std::path::Path;

use crate::io::remove_path;
use crate::path::{join_relative, parent_of};
use crate::state::{PathHashPair, State, covers, is_empty_dir};
use crate::{Error, Result};

/// Options for [`sync`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Allow renaming files out of the source tree instead of copying them.
    ///
    /// Must be false when the source has to stay intact afterwards.
    pub can_move: bool,
}

impl SyncOptions {
    pub fn moving() -> Self {
        Self { can_move: true }
    }

    pub fn copying() -> Self {
        Self { can_move: false }
    }
}

/// What a [`sync`] call did to the filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files copied into the target
    pub copied: usize,
    /// Files renamed from the source into the target
    pub moved: usize,
    /// Empty directories created in the target
    pub dirs_created: usize,
    /// Target entries deleted
    pub deleted: usize,
    /// Entries left alone because path and hash matched
    pub unchanged: usize,
}

impl SyncReport {
    /// Number of filesystem mutations performed
    pub fn operations(&self) -> usize {
        self.copied + self.moved + self.dirs_created + self.deleted
    }
}

/// Make the tree at `target_root` match the tree at `source_root`.
///
/// `source_state` and `target_state` must describe the two trees. On return
/// `target_state` describes the new target tree and `source_state` the
/// source tree, minus any files that were moved out of it (a source directory
/// emptied by moves is listed as an empty directory).
///
/// When an operation fails the error is returned immediately. The target is
/// then a mix of old and new content which a later sync converges from; both
/// states keep the entries that were not processed yet.
pub fn sync(
    source_root: &Path,
    source_state: &mut State,
    target_root: &Path,
    target_state: &mut State,
    options: SyncOptions,
) -> Result<SyncReport> {
    let source_entries = std::mem::take(source_state).into_entries();
    let target_entries = std::mem::take(target_state).into_entries();

    let mut merge = Merge {
        source_root,
        target_root,
        options,
        new_source: State::default(),
        new_target: Vec::with_capacity(source_entries.len()),
        report: SyncReport::default(),
    };

    let mut s = 0;
    let mut t = 0;
    let result = loop {
        let step = match (source_entries.get(s), target_entries.get(t)) {
            (None, None) => break Ok(()),
            (Some(source), target) if target.is_none_or(|tgt| source.path < tgt.path) => {
                s += 1;
                merge.source_only(source)
            }
            (source, Some(target)) if source.is_none_or(|src| src.path > target.path) => {
                t += 1;
                merge.target_only(target, &source_entries[s..])
            }
            (Some(source), Some(target)) => {
                s += 1;
                t += 1;
                merge.both(source, target)
            }
            // Both guards above cover every case where one side is None
            (None, Some(_)) | (Some(_), None) => unreachable!("merge guard mismatch"),
        };
        if let Err(e) = step {
            break Err(e);
        }
    };

    let Merge {
        mut new_source,
        mut new_target,
        report,
        ..
    } = merge;

    if let Err(e) = result {
        for entry in &source_entries[s..] {
            new_source.insert(entry.clone());
        }
        new_target.extend_from_slice(&target_entries[t..]);
        *source_state = new_source;
        *target_state = State::new(new_target);
        return Err(e);
    }

    if new_target.is_empty() && target_root.is_dir() && is_empty_dir(target_root)? {
        new_target.push(PathHashPair::dir(""));
    }
    *source_state = new_source;
    *target_state = State::from_sorted(new_target);

    tracing::debug!(
        "synced {} -> {}: {} copied, {} moved, {} dirs, {} deleted, {} unchanged",
        source_root.display(),
        target_root.display(),
        report.copied,
        report.moved,
        report.dirs_created,
        report.deleted,
        report.unchanged
    );
    Ok(report)
}

/// Bring a single entry from `source` to `target` without recursing.
///
/// For a directory this only creates the (empty) directory, after removing
/// whatever was at `target`; the files inside are separate state entries.
/// For a file, whatever is at `target` is replaced and the file is renamed
/// when `can_move` allows it, copied otherwise. Returns true if the file was
/// moved.
pub fn shallow_move_or_copy(source: &Path, target: &Path, can_move: bool) -> Result<bool> {
    let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
    remove_path(target)?;
    if metadata.is_dir() {
        fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
        return Ok(false);
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    if can_move {
        match fs::rename(source, target) {
            Ok(()) => return Ok(true),
            Err(e) => tracing::debug!(
                "rename {} failed ({}), copying instead",
                source.display(),
                e
            ),
        }
    }
    fs::copy(source, target).map_err(|e| Error::io(source, e))?;
    Ok(false)
}

struct Merge<'a> {
    source_root: &'a Path,
    target_root: &'a Path,
    options: SyncOptions,
    new_source: State,
    new_target: Vec<PathHashPair>,
    report: SyncReport,
}

impl Merge<'_> {
    fn source_only(&mut self, source: &PathHashPair) -> Result<()> {
        if source.path.is_empty() {
            // Empty source root: the target root only has to exist
            if !self.target_root.is_dir() {
                fs::create_dir_all(self.target_root)
                    .map_err(|e| Error::io(self.target_root, e))?;
                self.report.dirs_created += 1;
            }
            self.new_target.push(source.clone());
            self.new_source.insert(source.clone());
            return Ok(());
        }
        tracing::debug!("add {}", source.path);
        self.transfer(source)
    }

    fn target_only(&mut self, target: &PathHashPair, pending_source: &[PathHashPair]) -> Result<()> {
        if target.is_dir() && (target.path.is_empty() || covers(pending_source, &target.path)) {
            // The directory is about to receive files; keep it
            return Ok(());
        }
        if self.replaced_by_file(&target.path) {
            tracing::debug!("{} went with its replaced parent", target.path);
            return Ok(());
        }
        tracing::debug!("delete {}", target.path);
        remove_path(&join_relative(self.target_root, &target.path))?;
        self.report.deleted += 1;
        self.prune_empty_parents(&target.path, pending_source)
    }

    /// Whether an ancestor of `path` was already written as a file, which
    /// removed the directory `path` lived in.
    fn replaced_by_file(&self, path: &str) -> bool {
        let mut current = parent_of(path);
        while let Some(dir) = current.filter(|d| !d.is_empty()) {
            let found = self
                .new_target
                .binary_search_by(|e| e.path.as_str().cmp(dir))
                .is_ok_and(|i| !self.new_target[i].is_dir());
            if found {
                return true;
            }
            current = parent_of(dir);
        }
        false
    }

    fn both(&mut self, source: &PathHashPair, target: &PathHashPair) -> Result<()> {
        if source.hash == target.hash {
            self.report.unchanged += 1;
            self.new_target.push(target.clone());
            self.new_source.insert(source.clone());
            return Ok(());
        }
        tracing::debug!("update {}", source.path);
        self.transfer(source)
    }

    /// Copy or move one source entry over the target and record it.
    fn transfer(&mut self, source: &PathHashPair) -> Result<()> {
        let from = join_relative(self.source_root, &source.path);
        let to = join_relative(self.target_root, &source.path);
        let moved = shallow_move_or_copy(&from, &to, self.options.can_move && !source.is_dir())?;
        self.new_target.push(source.clone());

        if source.is_dir() {
            self.report.dirs_created += 1;
            self.new_source.insert(source.clone());
        } else if moved {
            self.report.moved += 1;
            if let Some(parent) = parent_of(&source.path) {
                let parent_dir = join_relative(self.source_root, parent);
                if is_empty_dir(&parent_dir)? {
                    self.new_source.insert(PathHashPair::dir(parent));
                }
            }
        } else {
            self.report.copied += 1;
            self.new_source.insert(source.clone());
        }
        Ok(())
    }

    /// Remove target directories emptied by a deletion, walking upwards,
    /// unless something already synced or still to come lives in them.
    fn prune_empty_parents(&mut self, deleted: &str, pending_source: &[PathHashPair]) -> Result<()> {
        let mut current = parent_of(deleted);
        while let Some(dir) = current {
            if dir.is_empty() {
                break;
            }
            if covers(&self.new_target, dir) || covers(pending_source, dir) {
                break;
            }
            let native = join_relative(self.target_root, dir);
            match fs::read_dir(&native) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    current = parent_of(dir);
                    continue;
                }
                Err(e) => return Err(Error::io(&native, e)),
            }
            fs::remove_dir(&native).map_err(|e| Error::io(&native, e))?;
            current = parent_of(dir);
        }
        Ok(())
    }
}
