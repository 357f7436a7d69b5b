//! Moving the finished workspace into the export targets

use std::fs;
use std::path::Path;

use regolith_fs::recycled::{SyncOptions, sync};
use regolith_fs::state::{deep_copy_and_get_state, sha256_state};
use regolith_fs::{EditedFiles, PathStateCache, RevertibleFsOperations, State};
use sha2::{Digest, Sha256};

use super::{ExportPaths, resolve_export_paths};
use crate::context::{Experiment, RunContext};
use crate::error::{Error, Result};

/// Record of files written to export targets, under `.regolith/cache`
pub const EDITED_FILES_FILE: &str = "edited_files.json";
/// Cached target states, under `.regolith/cache`
pub const PATH_STATES_FILE: &str = "path_states.json";
/// Backup directory of the data write-back, under `.regolith/cache`
pub const BACKUP_DIR: &str = "backup";

/// Export the workspace of `ctx`'s profile.
///
/// Refuses to touch targets holding files Regolith did not write. The
/// file watcher, if any, is paused for the duration.
pub fn export_project(ctx: &RunContext) -> Result<()> {
    let profile = ctx.profile()?;
    let paths = resolve_export_paths(&profile.export, ctx.config, ctx.game_dirs)
        .map_err(|e| Error::Export { source: Box::new(e) })?;
    let uses_data = uses_data_export(ctx)?;

    if let Some(interruption) = ctx.interruption {
        interruption.pause_watch();
    }
    let result = export_to(ctx, &paths, uses_data);
    if let Some(interruption) = ctx.interruption {
        interruption.resume_watch();
    }
    result.map_err(|e| Error::Export { source: Box::new(e) })
}

fn uses_data_export(ctx: &RunContext) -> Result<bool> {
    for filter in &ctx.profile()?.filters {
        if !filter.is_disabled(ctx)? && filter.is_using_data_export(ctx)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn export_to(ctx: &RunContext, paths: &ExportPaths, uses_data: bool) -> Result<()> {
    let cache_dir = ctx.cache_dir();
    let edited_path = cache_dir.join(EDITED_FILES_FILE);
    let states_path = cache_dir.join(PATH_STATES_FILE);

    let mut edited = EditedFiles::load(&edited_path);
    edited.check_deletion_safety(&paths.rp, &paths.bp)?;

    let can_move = !ctx.settings.has(Experiment::SizeTimeCheck);
    let mut states = PathStateCache::load(&states_path);
    let cached_bp = states.validated(&paths.bp);
    let cached_rp = states.validated(&paths.rp);
    // A half-synced target must not be trusted on the next run
    let had_bp = states.remove(&paths.bp).is_some();
    let had_rp = states.remove(&paths.rp).is_some();
    if had_bp || had_rp {
        states.save(&states_path)?;
    }

    let tmp = ctx.tmp_dir();
    let bp_state = export_pack(&tmp.join("BP"), &paths.bp, cached_bp, can_move)?;
    states.set(&paths.bp, bp_state);
    let rp_state = export_pack(&tmp.join("RP"), &paths.rp, cached_rp, can_move)?;
    states.set(&paths.rp, rp_state);
    states.save(&states_path)?;

    if uses_data {
        export_data(ctx, can_move)?;
    }

    edited.update_from_paths(&paths.rp, &paths.bp)?;
    if let Err(e) = edited.dump(&edited_path) {
        // The export itself is complete; only the next safety check is affected
        tracing::error!("could not save {}: {}", edited_path.display(), e);
    }
    Ok(())
}

/// Reconcile one pack directory and return the target's new state.
fn export_pack(source: &Path, target: &Path, cached: Option<State>, can_move: bool) -> Result<State> {
    if !source.exists() {
        tracing::warn!("{} is missing, exporting an empty pack", source.display());
        fs::create_dir_all(source).map_err(|e| regolith_fs::Error::io(source, e))?;
    }
    let mut target_state = match cached {
        Some(state) => state,
        None if !target.exists() => {
            tracing::info!("Exporting {} (new)", target.display());
            return Ok(deep_copy_and_get_state(source, target, &mut Sha256::new())?);
        }
        None => {
            tracing::debug!("no cached state for {}, hashing", target.display());
            sha256_state(target)?
        }
    };
    let mut source_state = sha256_state(source)?;
    let report = sync(
        source,
        &mut source_state,
        target,
        &mut target_state,
        SyncOptions { can_move },
    )?;
    tracing::info!(
        "Exported {} ({} changed, {} unchanged)",
        target.display(),
        report.operations(),
        report.unchanged
    );
    Ok(target_state)
}

/// Bring the workspace data folder back to the project.
///
/// Normally the project's data folder is replaced as one revertible batch.
/// When the workspace is kept between runs it is reconciled by copying.
fn export_data(ctx: &RunContext, can_move: bool) -> Result<()> {
    let data = ctx.config.data_path.as_path();
    let tmp_data = ctx.tmp_dir().join("data");
    if !tmp_data.exists() {
        return Ok(());
    }

    if !can_move {
        fs::create_dir_all(data).map_err(|e| regolith_fs::Error::io(data, e))?;
        let mut source_state = sha256_state(&tmp_data)?;
        let mut target_state = sha256_state(data)?;
        sync(&tmp_data, &mut source_state, data, &mut target_state, SyncOptions::copying())?;
        return Ok(());
    }

    let mut ops = RevertibleFsOperations::new(ctx.cache_dir().join(BACKUP_DIR))?;
    let result = ops
        .delete_dir(data)
        .and_then(|()| ops.move_or_copy_dir(&tmp_data, data));
    if let Err(e) = result {
        tracing::error!("data export failed, restoring {}: {}", data.display(), e);
        if let Err(undo_err) = ops.undo() {
            tracing::error!(
                "restore incomplete; the backup is kept in {}",
                ops.backup_dir().display()
            );
            return Err(undo_err.into());
        }
        ops.close()?;
        return Err(e.into());
    }
    ops.close()?;
    Ok(())
}
