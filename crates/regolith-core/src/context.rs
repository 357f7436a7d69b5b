//! Per-run state handed to every filter
//!
//! A [`RunContext`] lives for one profile execution. Nested profiles get a
//! child context pointing at their parent, which is how circular profile
//! references are found.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::condition::ConditionEnv;
use crate::config::{Config, Profile};
use crate::error::{Error, Result};
use crate::export::GameDirectories;

/// Opt-in behavior changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Experiment {
    /// Keep the workspace between runs and reconcile it instead of
    /// recreating it; exports copy instead of moving.
    SizeTimeCheck,
}

impl Experiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SizeTimeCheck => "size_time_check",
        }
    }
}

impl FromStr for Experiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "size_time_check" => Ok(Self::SizeTimeCheck),
            _ => Err(Error::UnknownExperiment { name: s.to_string() }),
        }
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    pub experiments: BTreeSet<Experiment>,
    /// Keep running and restart on every interruption signal
    pub watch: bool,
}

impl RunSettings {
    pub fn has(&self, experiment: Experiment) -> bool {
        self.experiments.contains(&experiment)
    }
}

/// Pause switch of an external file watcher.
///
/// Export writes into watched directories; the watcher is paused for the
/// duration so those writes are not reported as user edits.
pub trait WatchControl: Send + Sync {
    fn pause(&self);
    fn resume(&self);
}

/// Change signals from an external file watcher.
///
/// Each message names the changed source: `"rp"`, `"bp"` or `"data"`.
pub struct Interruption {
    receiver: Receiver<String>,
    watch: Option<Arc<dyn WatchControl>>,
}

impl Interruption {
    pub fn new(receiver: Receiver<String>) -> Self {
        Self {
            receiver,
            watch: None,
        }
    }

    pub fn with_watch_control(mut self, watch: Arc<dyn WatchControl>) -> Self {
        self.watch = Some(watch);
        self
    }

    /// Drain pending signals; true if any came from a source not in `ignored`.
    pub fn is_interrupted(&self, ignored: &[&str]) -> bool {
        let mut interrupted = false;
        for source in self.receiver.try_iter() {
            if ignored.contains(&source.as_str()) {
                tracing::debug!("ignoring change in {}", source);
            } else {
                tracing::debug!("change in {}", source);
                interrupted = true;
            }
        }
        interrupted
    }

    /// Block until the next signal. `None` once every sender is gone.
    pub fn wait(&self) -> Option<String> {
        self.receiver.recv().ok()
    }

    pub fn pause_watch(&self) {
        if let Some(watch) = &self.watch {
            watch.pause();
        }
    }

    pub fn resume_watch(&self) {
        if let Some(watch) = &self.watch {
            watch.resume();
        }
    }
}

impl fmt::Debug for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interruption")
            .field("pending", &self.receiver.len())
            .field("watch_control", &self.watch.is_some())
            .finish()
    }
}

/// Everything a filter needs to know about the run it is part of.
#[derive(Clone)]
pub struct RunContext<'a> {
    pub profile_name: String,
    pub config: &'a Config,
    /// Absolute project root (the directory holding `config.json`)
    pub project_root: &'a Path,
    /// Cache root, `<project>/.regolith`
    pub dot_regolith: &'a Path,
    pub settings: &'a RunSettings,
    pub game_dirs: &'a dyn GameDirectories,
    pub interruption: Option<&'a Interruption>,
    /// Context of the profile that invoked this one
    pub parent: Option<&'a RunContext<'a>>,
    /// First pass of a watch session (or the only pass of a plain run)
    pub initial: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(
        profile_name: impl Into<String>,
        config: &'a Config,
        dot_regolith: &'a Path,
        settings: &'a RunSettings,
        game_dirs: &'a dyn GameDirectories,
    ) -> Self {
        Self {
            profile_name: profile_name.into(),
            config,
            project_root: &config.project_root,
            dot_regolith,
            settings,
            game_dirs,
            interruption: None,
            parent: None,
            initial: true,
        }
    }

    pub fn with_interruption(mut self, interruption: &'a Interruption) -> Self {
        self.interruption = Some(interruption);
        self
    }

    /// Context for the nested profile `name`, invoked from `self`.
    pub fn child<'b>(&'b self, name: &str) -> RunContext<'b> {
        RunContext {
            profile_name: name.to_string(),
            config: self.config,
            project_root: self.project_root,
            dot_regolith: self.dot_regolith,
            settings: self.settings,
            game_dirs: self.game_dirs,
            interruption: self.interruption,
            parent: Some(self),
            initial: self.initial,
        }
    }

    pub fn profile(&self) -> Result<&'a Profile> {
        self.config
            .profiles
            .get(&self.profile_name)
            .ok_or_else(|| Error::UnknownProfile {
                name: self.profile_name.clone(),
            })
    }

    /// Profile names from the outermost context down to this one.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.profile_name.clone()];
        let mut current = self.parent;
        while let Some(ctx) = current {
            chain.push(ctx.profile_name.clone());
            current = ctx.parent;
        }
        chain.reverse();
        chain
    }

    /// Fail with [`Error::CircularProfile`] if entering `name` from here
    /// would revisit a profile already on the chain.
    pub fn ensure_not_circular(&self, name: &str) -> Result<()> {
        let mut chain = self.chain();
        if chain.iter().any(|p| p == name) {
            chain.push(name.to_string());
            return Err(Error::CircularProfile { chain });
        }
        Ok(())
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.dot_regolith.join("tmp")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dot_regolith.join("cache")
    }

    /// Installed filter code, `.regolith/cache/filters`
    pub fn filters_dir(&self) -> PathBuf {
        self.cache_dir().join("filters")
    }

    pub fn venv_dir(&self, slot: u32) -> PathBuf {
        self.cache_dir().join("venvs").join(slot.to_string())
    }

    pub fn is_interrupted(&self, ignored: &[&str]) -> bool {
        self.interruption.is_some_and(|i| i.is_interrupted(ignored))
    }

    pub fn condition_env(&self) -> ConditionEnv {
        ConditionEnv::current(&self.profile_name, self.initial, self.settings.watch)
    }
}

impl fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("profile_name", &self.profile_name)
            .field("project_root", &self.project_root)
            .field("chain", &self.chain())
            .field("initial", &self.initial)
            .finish()
    }
}
