//! Forward-slash path handling for state entries and cache keys
//!
//! State files and cache keys must compare equal across platforms, so every
//! relative path stored in a [`crate::State`] uses `/` separators and is
//! converted to a native path only when it is joined onto a real root.

use std::path::{Component, Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Used both for relative state entries (`"textures/blocks/dirt.png"`) and
/// for absolute cache keys (`"C:/Users/me/com.mojang/development_resource_packs/x_rp"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes and drops a trailing slash.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let mut normalized = path_str.replace('\\', "/");
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self { inner: normalized }
    }

    /// Path of `path` relative to `root`, normalized.
    ///
    /// Returns `None` when `path` is not inside `root`. The root itself maps
    /// to the empty path.
    pub fn relative(root: &Path, path: &Path) -> Option<Self> {
        let rel = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(Self {
            inner: parts.join("/"),
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

/// Join a forward-slash relative path onto a native root.
pub fn join_relative(root: &Path, rel: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in rel.split('/').filter(|p| !p.is_empty()) {
        out.push(part);
    }
    out
}

/// Parent of a forward-slash relative path; `""` for top-level entries and
/// `None` for the root itself.
pub fn parent_of(rel: &str) -> Option<&str> {
    if rel.is_empty() {
        return None;
    }
    Some(match rel.rfind('/') {
        Some(idx) => &rel[..idx],
        None => "",
    })
}
