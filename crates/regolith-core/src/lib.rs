//! Profile execution for Regolith
//!
//! This crate runs a profile's filters over a temporary copy of the project
//! and exports the result:
//!
//! - **Configuration**: `config.json` into a [`Config`] of profiles and
//!   filter definitions
//! - **Filter runners**: build-in, language, async, nested profile and
//!   remote filters behind one [`FilterRunner`] type
//! - **Profile execution**: workspace setup, filter sequencing, interruption
//!   and watch-mode restarts ([`run_profile`])
//! - **Export**: target resolution and reconciliation into the game
//!   directories ([`export::export_project`])
//!
//! # Architecture
//!
//! ```text
//!                 regolith-cli
//!                      |
//!                regolith-core
//!                      |
//!                 regolith-fs
//! ```
//!
//! Only one run may use a project's `.regolith` directory or an export target
//! at a time. Serializing runs is the caller's job.

pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod filter;
pub mod runner;
pub mod workspace;

pub use config::{Config, FilterDefinition, Profile};
pub use context::{Experiment, Interruption, RunContext, RunSettings, WatchControl};
pub use error::{Error, Result};
pub use export::{ExportPaths, ExportTarget, GameDirectories, SystemGameDirectories};
pub use filter::{FilterRunner, RunStatus};
pub use runner::{check_profile_impl, clean, install_dependencies, run_profile, run_profile_impl};
