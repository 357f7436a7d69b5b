//! `run` and `check`

use std::collections::BTreeSet;
use std::path::Path;

use colored::Colorize;
use regolith_core::runner::DOT_REGOLITH;
use regolith_core::{
    Config, Experiment, RunContext, RunSettings, SystemGameDirectories, check_profile_impl,
    run_profile,
};

use crate::error::Result;

/// Run `profile` of the project at `root` once.
pub fn run_run(root: &Path, profile: &str, experiments: &[String]) -> Result<()> {
    let experiments = experiments
        .iter()
        .map(|name| name.parse::<Experiment>())
        .collect::<regolith_core::Result<BTreeSet<_>>>()?;
    for experiment in &experiments {
        tracing::info!("Experiment {} enabled", experiment);
    }
    let settings = RunSettings {
        experiments,
        watch: false,
    };

    let config = Config::load(root)?;
    let dot_regolith = config.project_root.join(DOT_REGOLITH);
    let ctx = RunContext::new(profile, &config, &dot_regolith, &settings, &SystemGameDirectories);
    run_profile(&ctx)?;

    println!("{} Ran profile {}", "✓".green(), profile.cyan());
    Ok(())
}

/// Validate `profile` of the project at `root`.
pub fn run_check(root: &Path, profile: &str) -> Result<()> {
    let config = Config::load(root)?;
    let dot_regolith = config.project_root.join(DOT_REGOLITH);
    let settings = RunSettings::default();
    let ctx = RunContext::new(profile, &config, &dot_regolith, &settings, &SystemGameDirectories);
    check_profile_impl(&ctx)?;

    println!("{} Profile {} is valid", "✓".green(), profile.cyan());
    Ok(())
}
