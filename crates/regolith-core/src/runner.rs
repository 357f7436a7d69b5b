//! Profile execution
//!
//! ```text
//! SettingUp -> Running -> Exporting -> Done
//!     ^           |           |
//!     +-----------+-----------+   (interrupted)
//! ```
//!
//! Errors end the run immediately and leave the workspace as it is for
//! inspection.

use std::path::Path;

use regolith_fs::io::remove_path;

use crate::config::Config;
use crate::context::{RunContext, RunSettings};
use crate::error::{Error, Result};
use crate::export::export_project;
use crate::export::SystemGameDirectories;
use crate::filter::RunStatus;
use crate::workspace::setup_tmp_files;

/// Name of the cache root inside a project
pub const DOT_REGOLITH: &str = ".regolith";

/// Check, then run the profile of `ctx` until it completes without
/// interruption.
///
/// In watch mode the profile runs again after every interruption signal;
/// the loop ends cleanly once every sender of the interruption channel is
/// dropped.
pub fn run_profile(ctx: &RunContext) -> Result<()> {
    check_profile_impl(ctx)?;

    let mut initial = true;
    loop {
        let pass = RunContext {
            initial,
            ..ctx.clone()
        };
        initial = false;

        match run_once(&pass)? {
            RunStatus::Interrupted => {
                tracing::info!("Sources changed, restarting profile {}", ctx.profile_name);
                continue;
            }
            RunStatus::Completed => {
                tracing::info!("Successfully ran the {} profile", ctx.profile_name);
            }
        }

        if !ctx.settings.watch {
            return Ok(());
        }
        let Some(interruption) = ctx.interruption else {
            return Ok(());
        };
        tracing::info!("Watching for changes...");
        match interruption.wait() {
            Some(source) => tracing::info!("Change in {}, restarting", source),
            None => {
                tracing::info!("Watcher closed, stopping");
                return Ok(());
            }
        }
    }
}

fn run_once(ctx: &RunContext) -> Result<RunStatus> {
    tracing::info!("Setting up the workspace");
    setup_tmp_files(ctx)?;

    if run_profile_impl(ctx)?.is_interrupted() {
        return Ok(RunStatus::Interrupted);
    }

    tracing::info!("Exporting project");
    export_project(ctx)?;

    // The data write-back triggers the data watcher itself
    if ctx.is_interrupted(&["data"]) {
        return Ok(RunStatus::Interrupted);
    }
    Ok(RunStatus::Completed)
}

/// Run the filters of `ctx`'s profile in order, in the current workspace.
///
/// Stops at the first error. Returns [`RunStatus::Interrupted`] as soon as
/// a filter reports it or a change signal is pending.
pub fn run_profile_impl(ctx: &RunContext) -> Result<RunStatus> {
    let profile = ctx.profile()?;
    for (index, filter) in profile.filters.iter().enumerate() {
        let wrap = |e| Error::in_filter(&ctx.profile_name, index, filter.id(), e);
        if filter.is_disabled(ctx).map_err(wrap)? {
            tracing::debug!("skipping disabled filter #{} ({})", index, filter.id());
            continue;
        }
        let status = filter.run(ctx).map_err(wrap)?;
        if status.is_interrupted() || ctx.is_interrupted(&[]) {
            tracing::info!("Profile {} interrupted after filter #{}", ctx.profile_name, index);
            return Ok(RunStatus::Interrupted);
        }
    }
    Ok(RunStatus::Completed)
}

/// Validate the profile of `ctx` without running anything: export target,
/// filter references, conditions, runtimes and nested profiles.
pub fn check_profile_impl(ctx: &RunContext) -> Result<()> {
    let profile = ctx.profile()?;
    if ctx.parent.is_none() {
        profile.export.kind()?;
    }
    for (index, filter) in profile.filters.iter().enumerate() {
        filter
            .check(ctx)
            .map_err(|e| Error::in_filter(&ctx.profile_name, index, filter.id(), e))?;
    }
    Ok(())
}

/// Install the dependencies of every filter definition of `config`.
pub fn install_dependencies(config: &Config, dot_regolith: &Path) -> Result<()> {
    let settings = RunSettings::default();
    let ctx = RunContext::new("", config, dot_regolith, &settings, &SystemGameDirectories);
    for (id, definition) in &config.filter_definitions {
        tracing::info!("Installing dependencies of {}", id);
        definition.install_dependencies(&ctx)?;
    }
    Ok(())
}

/// Remove the workspace and the export caches of the project.
///
/// The backup directory is left alone; it may hold the only copy of data
/// from an interrupted write-back.
pub fn clean(project_root: &Path) -> Result<()> {
    let dot_regolith = project_root.join(DOT_REGOLITH);
    let cache = dot_regolith.join("cache");
    for path in [
        dot_regolith.join("tmp"),
        cache.join(crate::export::EDITED_FILES_FILE),
        cache.join(crate::export::PATH_STATES_FILE),
    ] {
        tracing::debug!("removing {}", path.display());
        remove_path(&path)?;
    }
    Ok(())
}
