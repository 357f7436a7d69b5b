//! Filter runners
//!
//! Every entry of a profile becomes a [`FilterRunner`]. The variants share
//! one contract: skip when disabled, `run` against a [`RunContext`] and
//! report whether the run was interrupted, `check` without running.

pub mod async_group;
pub mod build_in;
pub mod language;
pub mod profile_filter;
pub mod remote;

pub use async_group::AsyncFilterGroup;
pub use build_in::BuildInFilter;
pub use language::LanguageFilter;
pub use profile_filter::ProfileFilter;
pub use remote::RemoteFilter;

use serde_json::{Map, Value};

use crate::condition::{self, Condition};
use crate::context::RunContext;
use crate::error::Result;

/// How a filter run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// A source changed during the run; the profile must start over
    Interrupted,
}

impl RunStatus {
    pub fn is_interrupted(self) -> bool {
        self == Self::Interrupted
    }
}

/// Per-use options of a profile entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCommon {
    /// Definition id; empty for anonymous entries
    pub id: String,
    pub disabled: bool,
    /// `when` expression, see [`crate::condition`]
    pub when: Option<String>,
    /// Passed to the filter as compact JSON
    pub settings: Map<String, Value>,
    pub arguments: Vec<String>,
}

impl FilterCommon {
    pub fn is_disabled(&self, ctx: &RunContext) -> Result<bool> {
        if self.disabled {
            return Ok(true);
        }
        match &self.when {
            Some(when) => Ok(!condition::evaluate(when, &ctx.condition_env())?),
            None => Ok(false),
        }
    }

    /// Settings as a command-line argument; `None` when there are none.
    pub fn settings_json(&self) -> Result<Option<String>> {
        if self.settings.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&self.settings)?))
    }

    fn check(&self) -> Result<()> {
        if let Some(when) = &self.when {
            Condition::parse(when)?;
        }
        Ok(())
    }
}

/// One entry of a profile
#[derive(Debug, Clone)]
pub enum FilterRunner {
    BuildIn(BuildInFilter),
    Language(LanguageFilter),
    Async(AsyncFilterGroup),
    Profile(ProfileFilter),
    Remote(RemoteFilter),
}

impl FilterRunner {
    pub fn common(&self) -> &FilterCommon {
        match self {
            Self::BuildIn(f) => &f.common,
            Self::Language(f) => &f.common,
            Self::Async(f) => &f.common,
            Self::Profile(f) => &f.common,
            Self::Remote(f) => &f.common,
        }
    }

    fn common_mut(&mut self) -> &mut FilterCommon {
        match self {
            Self::BuildIn(f) => &mut f.common,
            Self::Language(f) => &mut f.common,
            Self::Async(f) => &mut f.common,
            Self::Profile(f) => &mut f.common,
            Self::Remote(f) => &mut f.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn is_disabled(&self, ctx: &RunContext) -> Result<bool> {
        self.common().is_disabled(ctx)
    }

    /// Run the filter. Callers skip disabled filters first.
    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        match self {
            Self::BuildIn(f) => f.run(ctx),
            Self::Language(f) => f.run(ctx),
            Self::Async(f) => f.run(ctx),
            Self::Profile(f) => f.run(ctx),
            Self::Remote(f) => f.run(ctx),
        }
    }

    /// Validate the filter without running it.
    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        self.common().check()?;
        match self {
            Self::BuildIn(_) => Ok(()),
            Self::Language(f) => f.definition.check(ctx),
            Self::Async(f) => f.check(ctx),
            Self::Profile(f) => f.check(ctx),
            Self::Remote(f) => f.check(ctx),
        }
    }

    /// Whether the filter writes to the data folder in a way that has to be
    /// exported back to the project.
    pub fn is_using_data_export(&self, ctx: &RunContext) -> Result<bool> {
        match self {
            Self::BuildIn(_) => Ok(false),
            Self::Language(f) => Ok(f.definition.export_data),
            Self::Async(f) => f.is_using_data_export(ctx),
            Self::Profile(f) => f.is_using_data_export(ctx),
            Self::Remote(f) => f.is_using_data_export(ctx),
        }
    }

    /// Take over the settings, arguments and virtual environment slot of the
    /// remote filter this runner was expanded from.
    pub fn copy_arguments(&mut self, from: &RemoteFilter) {
        let common = self.common_mut();
        common.settings = from.common.settings.clone();
        common.arguments = from.common.arguments.clone();
        if let Self::Language(f) = self {
            f.definition.venv_slot = from.definition.venv_slot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_settings_are_omitted() {
        let mut common = FilterCommon::default();
        assert_eq!(common.settings_json().unwrap(), None);

        common.settings.insert("a".into(), json!(1));
        assert_eq!(common.settings_json().unwrap().as_deref(), Some("{\"a\":1}"));
    }
}
