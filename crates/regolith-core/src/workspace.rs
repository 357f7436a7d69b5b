//! The temporary workspace filters run in (`.regolith/tmp`)

use std::fs;
use std::path::Path;
use std::thread;

use regolith_fs::io::{copy_recursive, remove_path};
use regolith_fs::recycled::{SyncOptions, sync};
use regolith_fs::state::sha256_state;

use crate::context::{Experiment, RunContext};
use crate::error::{Error, Result};

/// Workspace subdirectories, in the order they are reported
pub const WORKSPACE_DIRS: [&str; 3] = ["BP", "RP", "data"];

/// Fill `.regolith/tmp/{BP,RP,data}` from the project's packs.
///
/// The three trees are copied in parallel. Every copy runs to completion;
/// failures are collected into one [`Error::WorkspaceSetup`] whose source
/// is the first failure. With the `size_time_check` experiment the previous
/// workspace is kept and reconciled instead of recreated.
pub fn setup_tmp_files(ctx: &RunContext) -> Result<()> {
    let tmp = ctx.tmp_dir();
    let config = ctx.config;
    let reuse = ctx.settings.has(Experiment::SizeTimeCheck);
    if !reuse {
        remove_path(&tmp)?;
    }
    fs::create_dir_all(&tmp).map_err(|e| regolith_fs::Error::io(&tmp, e))?;

    let sources = [
        config.behavior_pack.as_deref(),
        config.resource_pack.as_deref(),
        Some(config.data_path.as_path()),
    ];

    let results: Vec<(&str, Result<()>)> = thread::scope(|scope| {
        let handles: Vec<_> = WORKSPACE_DIRS
            .iter()
            .zip(sources)
            .map(|(name, source)| {
                let target = tmp.join(name);
                (*name, scope.spawn(move || populate(source, &target, reuse)))
            })
            .collect();
        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(std::io::Error::other(format!("copy of {name} panicked")).into())
                });
                (name, result)
            })
            .collect()
    });

    let mut failed = Vec::new();
    let mut first = None;
    for (name, result) in results {
        if let Err(e) = result {
            if first.is_none() {
                first = Some(e);
            } else {
                tracing::error!("setting up {} also failed: {}", name, e);
            }
            failed.push(name.to_string());
        }
    }
    match first {
        Some(source) => Err(Error::WorkspaceSetup {
            failed,
            source: Box::new(source),
        }),
        None => Ok(()),
    }
}

fn populate(source: Option<&Path>, target: &Path, reuse: bool) -> Result<()> {
    let Some(source) = source.filter(|s| s.exists()) else {
        if let Some(source) = source {
            tracing::warn!("{} does not exist, using an empty directory", source.display());
        }
        remove_path(target)?;
        fs::create_dir_all(target).map_err(|e| regolith_fs::Error::io(target, e))?;
        return Ok(());
    };

    if reuse && target.exists() {
        let mut source_state = sha256_state(source)?;
        let mut target_state = sha256_state(target)?;
        let report = sync(source, &mut source_state, target, &mut target_state, SyncOptions::copying())?;
        tracing::debug!("refreshed {} ({} changes)", target.display(), report.operations());
        return Ok(());
    }
    copy_recursive(source, target)?;
    Ok(())
}
