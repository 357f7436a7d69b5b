//! A profile run as a step of another profile (`{"profile": "name"}`)

use super::{FilterCommon, RunStatus};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::runner::{check_profile_impl, run_profile_impl};

#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub common: FilterCommon,
    /// Name of the nested profile
    pub profile: String,
}

impl ProfileFilter {
    pub fn new(common: FilterCommon, profile: &str) -> Self {
        Self {
            common,
            profile: profile.to_string(),
        }
    }

    /// Run the nested profile's filters in the current workspace. The nested
    /// profile's export target is not used.
    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        ctx.ensure_not_circular(&self.profile)?;
        tracing::info!("Running nested profile {}", self.profile);
        let child = ctx.child(&self.profile);
        run_profile_impl(&child).map_err(|e| self.wrap(e))
    }

    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        ctx.ensure_not_circular(&self.profile)?;
        let child = ctx.child(&self.profile);
        check_profile_impl(&child).map_err(|e| self.wrap(e))
    }

    pub fn is_using_data_export(&self, ctx: &RunContext) -> Result<bool> {
        ctx.ensure_not_circular(&self.profile)?;
        let child = ctx.child(&self.profile);
        for filter in &child.profile()?.filters {
            if !filter.is_disabled(&child)? && filter.is_using_data_export(&child)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn wrap(&self, e: Error) -> Error {
        Error::InProfile {
            profile: self.profile.clone(),
            source: Box::new(e),
        }
    }
}
