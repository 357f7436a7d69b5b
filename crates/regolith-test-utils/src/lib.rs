//! Shared test utilities for the Regolith workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: build directory trees from literal tables and snapshot them
//! - [`project`]: [`TestProject`] builder for a complete Regolith project

pub mod project;
pub mod tree;

pub use project::TestProject;
pub use tree::{Entry, build_tree, files, snapshot, snapshot_mtimes};
