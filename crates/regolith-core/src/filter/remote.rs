//! Filters installed from a repository (`{"url": ...}`)
//!
//! Installed code lives in `.regolith/cache/filters/<id>` with a
//! `filter.json` listing the subfilters to run:
//!
//! ```json
//! { "filters": [ { "runWith": "python", "script": "./main.py" } ], "exportData": false }
//! ```
//!
//! Downloading that code is not done here; a missing `filter.json` is
//! reported as [`Error::FilterNotInstalled`].

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use super::{FilterCommon, FilterRunner, RunStatus};
use crate::config::FilterDefinition;
use crate::context::RunContext;
use crate::error::{Error, Result};

/// Name of the manifest inside an installed remote filter
pub const MANIFEST_FILE: &str = "filter.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDefinition {
    pub id: String,
    pub url: String,
    pub version: Option<String>,
    pub venv_slot: u32,
    pub export_data: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteManifest {
    #[serde(default)]
    filters: Vec<Value>,
    #[serde(default)]
    export_data: bool,
}

/// A subfilter entry of `filter.json` with its per-entry switches
struct Subfilter {
    definition: FilterDefinition,
    disabled: bool,
    when: Option<String>,
}

impl RemoteDefinition {
    pub fn install_dir(&self, ctx: &RunContext) -> PathBuf {
        ctx.filters_dir().join(&self.id)
    }

    fn manifest(&self, ctx: &RunContext) -> Result<RemoteManifest> {
        let path = self.install_dir(ctx).join(MANIFEST_FILE);
        if !path.exists() {
            return Err(Error::FilterNotInstalled {
                id: self.id.clone(),
                path,
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| regolith_fs::Error::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
            path,
            message: e.to_string(),
        })
    }

    fn subfilters(&self, ctx: &RunContext) -> Result<Vec<Subfilter>> {
        let dir = self.install_dir(ctx);
        self.manifest(ctx)?
            .filters
            .iter()
            .map(|value| {
                let definition = FilterDefinition::from_json(&self.id, value, &dir)?;
                if let FilterDefinition::Remote(nested) = &definition {
                    return Err(Error::NestedRemoteFilter {
                        id: self.id.clone(),
                        nested: nested.url.clone(),
                    });
                }
                Ok(Subfilter {
                    definition,
                    disabled: value.get("disabled").and_then(Value::as_bool).unwrap_or(false),
                    when: value.get("when").and_then(Value::as_str).map(str::to_string),
                })
            })
            .collect()
    }

    /// The code is installed and every subfilter passes its own check.
    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        for sub in self.subfilters(ctx)? {
            sub.definition.check(ctx)?;
        }
        Ok(())
    }

    pub fn install_dependencies(&self, ctx: &RunContext) -> Result<()> {
        for sub in self.subfilters(ctx)? {
            if let FilterDefinition::Language(d) = &sub.definition {
                d.install_dependencies(ctx, self.venv_slot)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RemoteFilter {
    pub common: FilterCommon,
    pub definition: RemoteDefinition,
}

impl RemoteFilter {
    pub fn new(common: FilterCommon, definition: RemoteDefinition) -> Self {
        Self { common, definition }
    }

    /// Runners for the subfilters, carrying this filter's settings,
    /// arguments and virtual environment slot.
    pub fn expand(&self, ctx: &RunContext) -> Result<Vec<FilterRunner>> {
        self.definition
            .subfilters(ctx)?
            .into_iter()
            .map(|sub| {
                let common = FilterCommon {
                    disabled: sub.disabled,
                    when: sub.when,
                    ..FilterCommon::default()
                };
                let mut runner = sub.definition.create_filter_runner(common)?;
                runner.copy_arguments(self);
                Ok(runner)
            })
            .collect()
    }

    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        tracing::info!("Running remote filter {}", self.common.id);
        for runner in self.expand(ctx)? {
            if runner.is_disabled(ctx)? {
                continue;
            }
            if runner.run(ctx)?.is_interrupted() {
                return Ok(RunStatus::Interrupted);
            }
        }
        Ok(RunStatus::Completed)
    }

    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        self.definition.check(ctx)
    }

    pub fn is_using_data_export(&self, ctx: &RunContext) -> Result<bool> {
        if self.definition.export_data {
            return Ok(true);
        }
        match self.definition.manifest(ctx) {
            Ok(manifest) => Ok(manifest.export_data),
            Err(Error::FilterNotInstalled { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
