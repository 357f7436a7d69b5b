//! Error types for regolith-core

use std::path::PathBuf;

/// Result type for regolith-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regolith-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Configuration
    /// `config.json` not found at the project root
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// `config.json` exists but does not match the schema
    #[error("Invalid configuration {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// A filter definition or reference that matches no known kind
    #[error("Unknown filter definition \"{id}\": {reason}")]
    UnknownFilterDefinition { id: String, reason: String },

    /// `runWith` names a runtime that is not supported
    #[error("Filter \"{id}\" uses unsupported runWith \"{run_with}\"")]
    UnsupportedRunWith { id: String, run_with: String },

    /// A profile filter entry has none of `filter`, `profile` or `asyncFilters`
    #[error("Profile \"{profile}\" filter #{index} is not a filter, profile or asyncFilters entry")]
    InvalidFilterEntry { profile: String, index: usize },

    #[error("Profile not found: {name}")]
    UnknownProfile { name: String },

    /// Nested profiles that reference each other
    #[error("Circular profile reference: {}", .chain.join(" -> "))]
    CircularProfile { chain: Vec<String> },

    #[error("Remote filter \"{id}\" contains another remote filter \"{nested}\"")]
    NestedRemoteFilter { id: String, nested: String },

    #[error("Invalid export target: {reason}")]
    InvalidExportTarget { reason: String },

    #[error("Unknown experiment: {name}")]
    UnknownExperiment { name: String },

    // Filter execution
    #[error("Runtime \"{program}\" not found on PATH{}", .hint.as_deref().unwrap_or(""))]
    RuntimeNotFound {
        program: String,
        hint: Option<String>,
    },

    #[error("Filter \"{id}\" exited with {}", .code.map(|c| format!("code {c}")).unwrap_or_else(|| "a signal".to_string()))]
    FilterFailed { id: String, code: Option<i32> },

    #[error("Failed to launch filter \"{id}\": {source}")]
    FilterLaunch {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// Filter code is missing from the cache
    #[error("Filter \"{id}\" is not installed: {path} does not exist")]
    FilterNotInstalled { id: String, path: PathBuf },

    #[error("Command \"{command}\" failed with exit code {code:?}")]
    CommandFailed { command: String, code: Option<i32> },

    // Export resolution
    #[error("com.mojang directory not found{}", .hint.as_deref().unwrap_or(""))]
    ComMojangNotFound { hint: Option<String> },

    #[error("No world named \"{name}\" in {path}")]
    WorldNotFound { name: String, path: PathBuf },

    #[error("World name \"{name}\" matches {} worlds", .matches.len())]
    AmbiguousWorld { name: String, matches: Vec<PathBuf> },

    // Conditions
    #[error("Invalid condition \"{expression}\": {reason}")]
    InvalidCondition { expression: String, reason: String },

    // Context chains
    #[error("Filter #{index} (\"{id}\") of profile \"{profile}\" failed")]
    InFilter {
        profile: String,
        index: usize,
        id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Nested profile \"{profile}\" failed")]
    InProfile {
        profile: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Export failed")]
    Export {
        #[source]
        source: Box<Error>,
    },

    /// Parallel workspace copies; `failed` names every tree that failed
    #[error("Failed to set up the workspace for {}", .failed.join(", "))]
    WorkspaceSetup {
        failed: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from regolith-fs
    #[error(transparent)]
    Fs(#[from] regolith_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn in_filter(profile: &str, index: usize, id: &str, source: Error) -> Self {
        Self::InFilter {
            profile: profile.to_string(),
            index,
            id: id.to_string(),
            source: Box::new(source),
        }
    }

    /// The wrapped cause of a context-chain variant.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::InFilter { source, .. }
            | Self::InProfile { source, .. }
            | Self::Export { source }
            | Self::WorkspaceSetup { source, .. } => Some(&**source),
            _ => None,
        }
    }

    /// The innermost error of a context chain.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Some(next) = current.cause() {
            current = next;
        }
        current
    }
}
