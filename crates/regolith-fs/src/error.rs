//! Error types for regolith-fs

use std::path::PathBuf;

/// Result type for regolith-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regolith-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source path does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Target path already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("Target directory is not empty: {path}")]
    TargetNotEmpty { path: PathBuf },

    #[error("Backup directory must be empty or absent: {path}")]
    BackupDirNotEmpty { path: PathBuf },

    #[error("Undo failed after {completed} of {total} steps: {message}")]
    UndoFailed {
        completed: usize,
        total: usize,
        message: String,
    },

    #[error(
        "Refusing to modify {target}: it contains {file} which was not created by Regolith. \
         Remove the export directory manually and run again."
    )]
    UnsafeToDelete { target: PathBuf, file: String },

    #[error("Failed to serialize cache {path}: {message}")]
    CacheSerialize { path: PathBuf, message: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
