//! Project maintenance: `install-deps` and `clean`

use std::path::Path;

use colored::Colorize;
use regolith_core::runner::DOT_REGOLITH;
use regolith_core::{Config, clean, install_dependencies};

use crate::error::Result;

pub fn run_install_deps(root: &Path) -> Result<()> {
    let config = Config::load(root)?;
    install_dependencies(&config, &config.project_root.join(DOT_REGOLITH))?;
    println!(
        "{} Installed dependencies of {} filters",
        "✓".green(),
        config.filter_definitions.len()
    );
    Ok(())
}

pub fn run_clean(root: &Path) -> Result<()> {
    clean(root)?;
    println!("{} Cleaned {}", "✓".green(), root.join(DOT_REGOLITH).display());
    Ok(())
}
