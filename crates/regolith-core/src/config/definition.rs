//! Filter definitions (`regolith.filterDefinitions`)
//!
//! A definition says how a filter is installed and launched. Profiles refer
//! to definitions by id and add per-use settings, which is what turns a
//! definition into a [`FilterRunner`].

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::resolve_path;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::filter::build_in::{BuildInDefinition, BuildInFilter};
use crate::filter::language::{EntryPoint, LanguageDefinition, LanguageFilter, Runtime};
use crate::filter::remote::{RemoteDefinition, RemoteFilter};
use crate::filter::{FilterCommon, FilterRunner};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefinition {
    url: Option<String>,
    version: Option<String>,
    run_with: Option<String>,
    script: Option<String>,
    command: Option<String>,
    exe: Option<String>,
    #[serde(default)]
    venv_slot: u32,
    #[serde(default)]
    export_data: bool,
}

/// How a filter is installed and launched
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDefinition {
    BuildIn(BuildInDefinition),
    Language(LanguageDefinition),
    Remote(RemoteDefinition),
}

impl FilterDefinition {
    /// Pick the definition kind from the keys of `value`.
    ///
    /// `url` makes a remote filter, `runWith` a language filter and a
    /// build-in id with neither a build-in. Relative script paths are
    /// resolved against `base_dir`.
    pub fn from_json(id: &str, value: &Value, base_dir: &Path) -> Result<Self> {
        let raw: RawDefinition = serde_json::from_value(value.clone()).map_err(|e| {
            Error::UnknownFilterDefinition {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(url) = raw.url {
            return Ok(Self::Remote(RemoteDefinition {
                id: id.to_string(),
                url,
                version: raw.version,
                venv_slot: raw.venv_slot,
                export_data: raw.export_data,
            }));
        }

        if let Some(run_with) = raw.run_with {
            let runtime: Runtime = run_with.parse().map_err(|_| Error::UnsupportedRunWith {
                id: id.to_string(),
                run_with: run_with.clone(),
            })?;
            let missing = |key: &str| Error::UnknownFilterDefinition {
                id: id.to_string(),
                reason: format!("runWith \"{run_with}\" requires \"{key}\""),
            };
            let (entry, filter_dir) = match runtime {
                Runtime::Shell => {
                    let command = raw.command.ok_or_else(|| missing("command"))?;
                    (EntryPoint::Command(command), base_dir.to_path_buf())
                }
                Runtime::Exe => {
                    let exe = resolve_path(base_dir, &raw.exe.ok_or_else(|| missing("exe"))?);
                    let dir = exe.parent().unwrap_or(base_dir).to_path_buf();
                    (EntryPoint::Script(exe), dir)
                }
                _ => {
                    let script = resolve_path(base_dir, &raw.script.ok_or_else(|| missing("script"))?);
                    let dir = script.parent().unwrap_or(base_dir).to_path_buf();
                    (EntryPoint::Script(script), dir)
                }
            };
            return Ok(Self::Language(LanguageDefinition {
                id: id.to_string(),
                runtime,
                entry,
                filter_dir,
                venv_slot: raw.venv_slot,
                export_data: raw.export_data,
            }));
        }

        if BuildInDefinition::exists(id) {
            return Ok(Self::BuildIn(BuildInDefinition::new(id)));
        }

        Err(Error::UnknownFilterDefinition {
            id: id.to_string(),
            reason: "expected \"url\", \"runWith\" or a build-in filter id".to_string(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::BuildIn(d) => &d.id,
            Self::Language(d) => &d.id,
            Self::Remote(d) => &d.id,
        }
    }

    /// A runner for one use of this definition in a profile.
    pub fn create_filter_runner(&self, common: FilterCommon) -> Result<FilterRunner> {
        Ok(match self {
            Self::BuildIn(d) => FilterRunner::BuildIn(BuildInFilter::new(common, d.clone())),
            Self::Language(d) => FilterRunner::Language(LanguageFilter::new(common, d.clone())),
            Self::Remote(d) => FilterRunner::Remote(RemoteFilter::new(common, d.clone())),
        })
    }

    /// Verify the filter can be launched: runtime present, code installed.
    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        match self {
            Self::BuildIn(_) => Ok(()),
            Self::Language(d) => d.check(ctx),
            Self::Remote(d) => d.check(ctx),
        }
    }

    /// Install what the filter needs to run (virtual environments, npm
    /// packages). Fetching remote filter code is not done here.
    pub fn install_dependencies(&self, ctx: &RunContext) -> Result<()> {
        match self {
            Self::BuildIn(_) => Ok(()),
            Self::Language(d) => d.install_dependencies(ctx, d.venv_slot),
            Self::Remote(d) => d.install_dependencies(ctx),
        }
    }
}
