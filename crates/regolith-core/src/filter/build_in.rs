//! Filters compiled into Regolith

use super::{FilterCommon, RunStatus};
use crate::context::RunContext;
use crate::error::Result;

/// Ids of every build-in filter
const BUILD_IN_FILTERS: &[&str] = &["hello_world"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInDefinition {
    pub id: String,
}

impl BuildInDefinition {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    pub fn exists(id: &str) -> bool {
        BUILD_IN_FILTERS.contains(&id)
    }
}

#[derive(Debug, Clone)]
pub struct BuildInFilter {
    pub common: FilterCommon,
    pub definition: BuildInDefinition,
}

impl BuildInFilter {
    pub fn new(common: FilterCommon, definition: BuildInDefinition) -> Self {
        Self { common, definition }
    }

    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        match self.definition.id.as_str() {
            "hello_world" => {
                tracing::info!("Hello world! (profile {})", ctx.profile_name);
            }
            other => tracing::warn!("build-in filter {} does nothing", other),
        }
        Ok(RunStatus::Completed)
    }
}
