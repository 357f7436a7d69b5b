//! Export targets
//!
//! A profile's `export` object names where the built packs go. Resolution
//! turns it into concrete behavior and resource pack directories; the
//! descriptor is validated before any filesystem access.

mod game_dirs;
mod project;

pub use game_dirs::{GameDirectories, SystemGameDirectories, find_world, list_worlds};
pub use project::{BACKUP_DIR, EDITED_FILES_FILE, PATH_STATES_FILE, export_project};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{Config, resolve_path};
use crate::error::{Error, Result};

/// The `export` object of a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTarget {
    /// `development`, `preview`, `exact`, `world` or `local`
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_path: Option<String>,
    /// Pack folder names; default `<project>_rp` and `<project>_bp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Development,
    Preview,
    Exact,
    World,
    Local,
}

/// Resolved pack directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub bp: PathBuf,
    pub rp: PathBuf,
}

impl ExportTarget {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ..Self::default()
        }
    }

    /// Validate the option combination and return the target kind.
    pub fn kind(&self) -> Result<TargetKind> {
        let invalid = |reason: String| Err(Error::InvalidExportTarget { reason });
        let kind = match self.target.as_str() {
            "development" => TargetKind::Development,
            "preview" => TargetKind::Preview,
            "exact" => TargetKind::Exact,
            "world" => TargetKind::World,
            "local" => TargetKind::Local,
            other => return invalid(format!("unknown target \"{other}\"")),
        };

        let has_world = self.world_name.is_some() || self.world_path.is_some();
        let has_exact = self.rp_path.is_some() || self.bp_path.is_some();
        match kind {
            TargetKind::World => {
                if self.world_name.is_some() && self.world_path.is_some() {
                    return invalid("\"worldName\" and \"worldPath\" are mutually exclusive".into());
                }
                if !has_world {
                    return invalid("\"world\" needs \"worldName\" or \"worldPath\"".into());
                }
            }
            _ if has_world => {
                return invalid(format!("\"{}\" does not take a world", self.target));
            }
            _ => {}
        }
        match kind {
            TargetKind::Exact => {
                if self.rp_path.is_none() || self.bp_path.is_none() {
                    return invalid("\"exact\" needs both \"rpPath\" and \"bpPath\"".into());
                }
            }
            _ if has_exact => {
                return invalid(format!("\"{}\" does not take \"rpPath\"/\"bpPath\"", self.target));
            }
            _ => {}
        }
        Ok(kind)
    }

    fn bp_name(&self, project: &str) -> String {
        self.bp_name.clone().unwrap_or_else(|| format!("{project}_bp"))
    }

    fn rp_name(&self, project: &str) -> String {
        self.rp_name.clone().unwrap_or_else(|| format!("{project}_rp"))
    }
}

/// Resolve `target` to pack directories for the project in `config`.
pub fn resolve_export_paths(
    target: &ExportTarget,
    config: &Config,
    game_dirs: &dyn GameDirectories,
) -> Result<ExportPaths> {
    let root = config.project_root.as_path();
    let bp_name = target.bp_name(&config.name);
    let rp_name = target.rp_name(&config.name);
    let in_game = |com_mojang: &Path| ExportPaths {
        bp: com_mojang.join("development_behavior_packs").join(&bp_name),
        rp: com_mojang.join("development_resource_packs").join(&rp_name),
    };

    Ok(match target.kind()? {
        TargetKind::Development => in_game(&game_dirs.com_mojang()?),
        TargetKind::Preview => in_game(&game_dirs.com_mojang_preview()?),
        TargetKind::Exact => ExportPaths {
            bp: resolve_path(root, target.bp_path.as_deref().unwrap_or_default()),
            rp: resolve_path(root, target.rp_path.as_deref().unwrap_or_default()),
        },
        TargetKind::World => {
            let world = match (&target.world_path, &target.world_name) {
                (Some(path), _) => resolve_path(root, path),
                (None, Some(name)) => find_world(&game_dirs.com_mojang()?, name)?,
                (None, None) => {
                    return Err(Error::InvalidExportTarget {
                        reason: "\"world\" needs \"worldName\" or \"worldPath\"".into(),
                    });
                }
            };
            ExportPaths {
                bp: world.join("behavior_packs").join(&bp_name),
                rp: world.join("resource_packs").join(&rp_name),
            }
        }
        TargetKind::Local => ExportPaths {
            bp: root.join("build").join("BP"),
            rp: root.join("build").join("RP"),
        },
    })
}
