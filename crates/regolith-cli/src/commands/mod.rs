//! Command implementations for regolith-cli

pub mod project;
pub mod run;

pub use project::{run_clean, run_install_deps};
pub use run::{run_check, run_run};
