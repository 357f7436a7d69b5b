//! Filesystem layer for Regolith
//!
//! Everything that touches the project's files on disk lives here:
//!
//! - **Revertible operations**: multi-step moves and deletions that can be
//!   rolled back as a unit ([`RevertibleFsOperations`])
//! - **State**: sorted `(path, hash)` snapshots of a directory tree
//! - **Recycled sync**: hash-diff reconciliation of a target tree against a
//!   source tree with minimal I/O ([`recycled::sync`])
//! - **Edited files**: the record of files Regolith wrote to each export
//!   target, used to refuse deleting user-made content ([`EditedFiles`])
//!
//! Nothing in this crate knows about filters or profiles.

pub mod checksum;
pub mod edited_files;
pub mod error;
pub mod io;
pub mod path;
pub mod path_state;
pub mod recycled;
pub mod revertible;
pub mod state;

pub use edited_files::EditedFiles;
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use path_state::PathStateCache;
pub use recycled::SyncOptions;
pub use revertible::RevertibleFsOperations;
pub use state::{PathHashPair, State};
