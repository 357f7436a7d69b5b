//! Project configuration
//!
//! `config.json` is parsed into a [`Config`]: pack locations, filter
//! definitions keyed by id, and profiles whose filter entries are already
//! turned into [`FilterRunner`]s. Relative paths are resolved against the
//! project root at load time.

mod definition;

pub use definition::FilterDefinition;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::export::ExportTarget;
use crate::filter::build_in::BuildInDefinition;
use crate::filter::{AsyncFilterGroup, FilterCommon, FilterRunner, ProfileFilter};

/// Name of the configuration file at the project root
pub const CONFIG_FILE: &str = "config.json";

fn default_data_path() -> String {
    "./packs/data".to_string()
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    name: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    packs: RawPacks,
    regolith: RawRegolith,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPacks {
    behavior_pack: Option<String>,
    resource_pack: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRegolith {
    #[serde(default = "default_data_path")]
    data_path: String,
    #[serde(default)]
    filter_definitions: BTreeMap<String, Value>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    export: ExportTarget,
    #[serde(default)]
    filters: Vec<Value>,
}

/// A named filter sequence plus where its output goes
#[derive(Debug, Clone)]
pub struct Profile {
    pub filters: Vec<FilterRunner>,
    pub export: ExportTarget,
}

/// Parsed `config.json`
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub author: String,
    /// Absolute project root
    pub project_root: PathBuf,
    pub behavior_pack: Option<PathBuf>,
    pub resource_pack: Option<PathBuf>,
    pub data_path: PathBuf,
    pub filter_definitions: BTreeMap<String, FilterDefinition>,
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Load `config.json` from `project_root`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Err(Error::ConfigNotFound { path });
        }
        let content = fs::read_to_string(&path).map_err(|e| regolith_fs::Error::io(&path, e))?;
        let root = dunce::canonicalize(project_root).map_err(|e| regolith_fs::Error::io(project_root, e))?;
        Self::parse(&content, &root)
    }

    /// Parse configuration content for a project at `project_root`.
    pub fn parse(content: &str, project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        let raw: RawConfig = serde_json::from_str(content).map_err(|e| Error::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut filter_definitions = BTreeMap::new();
        for (id, value) in &raw.regolith.filter_definitions {
            let definition = FilterDefinition::from_json(id, value, project_root)?;
            filter_definitions.insert(id.clone(), definition);
        }

        let parser = EntryParser {
            path: &path,
            definitions: &filter_definitions,
        };
        let mut profiles = BTreeMap::new();
        for (name, raw_profile) in raw.regolith.profiles {
            let filters = raw_profile
                .filters
                .iter()
                .enumerate()
                .map(|(index, entry)| parser.parse(&name, index, entry))
                .collect::<Result<Vec<_>>>()?;
            profiles.insert(
                name,
                Profile {
                    filters,
                    export: raw_profile.export,
                },
            );
        }

        Ok(Self {
            name: raw.name,
            author: raw.author,
            project_root: project_root.to_path_buf(),
            behavior_pack: raw.packs.behavior_pack.map(|p| resolve_path(project_root, &p)),
            resource_pack: raw.packs.resource_pack.map(|p| resolve_path(project_root, &p)),
            data_path: resolve_path(project_root, &raw.regolith.data_path),
            filter_definitions,
            profiles,
        })
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles.get(name).ok_or_else(|| Error::UnknownProfile {
            name: name.to_string(),
        })
    }
}

/// `rel` joined onto `root` unless already absolute, with `.` segments
/// dropped so equal locations produce equal cache keys.
pub fn resolve_path(root: &Path, rel: &str) -> PathBuf {
    let path = Path::new(rel);
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        root.to_path_buf()
    };
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(base, |mut acc, c| {
            acc.push(c);
            acc
        })
}

/// Settings shared by every kind of profile filter entry
#[derive(Debug, Default, Deserialize)]
struct EntryFields {
    #[serde(default)]
    settings: Map<String, Value>,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    when: Option<String>,
}

struct EntryParser<'a> {
    path: &'a Path,
    definitions: &'a BTreeMap<String, FilterDefinition>,
}

impl EntryParser<'_> {
    fn parse(&self, profile: &str, index: usize, entry: &Value) -> Result<FilterRunner> {
        let invalid = || Error::InvalidFilterEntry {
            profile: profile.to_string(),
            index,
        };
        let object = entry.as_object().ok_or_else(invalid)?;
        let fields: EntryFields = serde_json::from_value(entry.clone()).map_err(|e| Error::ConfigParse {
            path: self.path.to_path_buf(),
            message: format!("profile \"{profile}\" filter #{index}: {e}"),
        })?;

        if let Some(id) = object.get("filter") {
            let id = id.as_str().ok_or_else(invalid)?;
            let common = fields.into_common(id);
            return match self.definitions.get(id) {
                Some(definition) => definition.create_filter_runner(common),
                None if BuildInDefinition::exists(id) => {
                    FilterDefinition::BuildIn(BuildInDefinition::new(id)).create_filter_runner(common)
                }
                None => Err(Error::UnknownFilterDefinition {
                    id: id.to_string(),
                    reason: format!("referenced by profile \"{profile}\" filter #{index} but not defined"),
                }),
            };
        }

        if let Some(name) = object.get("profile") {
            let name = name.as_str().ok_or_else(invalid)?;
            return Ok(FilterRunner::Profile(ProfileFilter::new(
                fields.into_common(""),
                name,
            )));
        }

        if let Some(children) = object.get("asyncFilters") {
            let children = children.as_array().ok_or_else(invalid)?;
            let filters = children
                .iter()
                .map(|child| self.parse(profile, index, child))
                .collect::<Result<Vec<_>>>()?;
            return Ok(FilterRunner::Async(AsyncFilterGroup::new(
                fields.into_common(""),
                filters,
            )));
        }

        Err(invalid())
    }
}

impl EntryFields {
    fn into_common(self, id: &str) -> FilterCommon {
        FilterCommon {
            id: id.to_string(),
            disabled: self.disabled,
            when: self.when,
            settings: self.settings,
            arguments: self.arguments,
        }
    }
}
