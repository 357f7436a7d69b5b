//! Filters run concurrently (`asyncFilters`)

use std::thread;
use std::time::Instant;

use super::{FilterCommon, FilterRunner, RunStatus};
use crate::context::RunContext;
use crate::error::{Error, Result};

/// A set of filters run at the same time, one thread each.
///
/// Siblings must not depend on each other's output.
#[derive(Debug, Clone)]
pub struct AsyncFilterGroup {
    pub common: FilterCommon,
    pub filters: Vec<FilterRunner>,
}

impl AsyncFilterGroup {
    pub fn new(common: FilterCommon, filters: Vec<FilterRunner>) -> Self {
        Self { common, filters }
    }

    /// Run every enabled child and wait for all of them.
    ///
    /// A failing child does not stop its siblings. The first error in
    /// completion order is returned; otherwise the group is interrupted if
    /// any child was.
    pub fn run(&self, ctx: &RunContext) -> Result<RunStatus> {
        let started = Instant::now();
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::scope(|scope| {
            for (index, filter) in self.filters.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = match filter.is_disabled(ctx) {
                        Ok(true) => Ok(RunStatus::Completed),
                        Ok(false) => filter.run(ctx),
                        Err(e) => Err(e),
                    };
                    // The receiver outlives the scope
                    let _ = tx.send((index, result));
                });
            }
        });
        drop(tx);

        let mut first_error = None;
        let mut interrupted = false;
        for (index, result) in rx.try_iter() {
            match result {
                Ok(status) => interrupted |= status.is_interrupted(),
                Err(e) => {
                    let id = self.filters[index].id().to_string();
                    if first_error.is_none() {
                        first_error = Some((index, id, e));
                    } else {
                        tracing::error!("async filter #{} ({}) also failed: {}", index, id, e);
                    }
                }
            }
        }
        tracing::debug!(
            "async group of {} finished in {:?}",
            self.filters.len(),
            started.elapsed()
        );

        if let Some((index, id, e)) = first_error {
            return Err(Error::in_filter(&ctx.profile_name, index, &id, e));
        }
        Ok(if interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        })
    }

    pub fn check(&self, ctx: &RunContext) -> Result<()> {
        for (index, filter) in self.filters.iter().enumerate() {
            filter
                .check(ctx)
                .map_err(|e| Error::in_filter(&ctx.profile_name, index, filter.id(), e))?;
        }
        Ok(())
    }

    pub fn is_using_data_export(&self, ctx: &RunContext) -> Result<bool> {
        for filter in &self.filters {
            if !filter.is_disabled(ctx)? && filter.is_using_data_export(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
