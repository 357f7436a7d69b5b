//! Cache of tree states keyed by tree root
//!
//! Hashing a multi-gigabyte export target on every run would dominate the
//! export time, so the state produced by the last sync is stored as JSON:
//!
//! ```json
//! { "/abs/target/root": [ { "path": "a.txt", "hash": "..." } ] }
//! ```
//!
//! A missing or unparsable cache file is a cache miss, never an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::path::{NormalizedPath, join_relative};
use crate::state::State;
use crate::{Error, Result, io};

/// In-memory view of the path-state cache file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathStateCache {
    states: BTreeMap<String, State>,
}

impl PathStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache file. Missing or corrupt files yield an empty cache.
    pub fn load(cache_file: &Path) -> Self {
        let content = match fs::read_to_string(cache_file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("could not read {}: {}; ignoring cache", cache_file.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("corrupt path state cache {}: {}; ignoring it", cache_file.display(), e);
                Self::default()
            }
        }
    }

    /// Write the cache file atomically.
    pub fn save(&self, cache_file: &Path) -> Result<()> {
        let content = serde_json::to_string(self).map_err(|e| Error::CacheSerialize {
            path: cache_file.to_path_buf(),
            message: e.to_string(),
        })?;
        io::write_atomic(cache_file, content.as_bytes())
    }

    fn key(root: &Path) -> String {
        NormalizedPath::new(root).as_str().to_string()
    }

    pub fn get(&self, root: &Path) -> Option<&State> {
        self.states.get(&Self::key(root))
    }

    pub fn set(&mut self, root: &Path, state: State) {
        self.states.insert(Self::key(root), state);
    }

    pub fn remove(&mut self, root: &Path) -> Option<State> {
        self.states.remove(&Self::key(root))
    }

    /// The cached state for `root` if every entry it lists still exists.
    ///
    /// Existence is checked with a stat per entry, which is far cheaper than
    /// hashing. Content edits to files that still exist are not detected.
    pub fn validated(&self, root: &Path) -> Option<State> {
        let state = self.get(root)?;
        if !root.is_dir() {
            return None;
        }
        let intact = state.iter().all(|entry| {
            let path = join_relative(root, &entry.path);
            if entry.is_dir() { path.is_dir() } else { path.is_file() }
        });
        if intact { Some(state.clone()) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PathHashPair;
    use tempfile::tempdir;

    #[test]
    fn corrupt_cache_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache_file = dir.path().join("path_states.json");
        fs::write(&cache_file, "{ not json").unwrap();

        assert_eq!(PathStateCache::load(&cache_file), PathStateCache::default());
    }

    #[test]
    fn round_trip_keeps_other_roots() {
        let dir = tempdir().unwrap();
        let cache_file = dir.path().join("cache/path_states.json");
        let a = dir.path().join("a");
        let b = dir.path().join("b");

        let mut cache = PathStateCache::new();
        cache.set(&a, State::new(vec![PathHashPair::file("x", "1")]));
        cache.save(&cache_file).unwrap();
        let mut cache = PathStateCache::load(&cache_file);
        cache.set(&b, State::new(vec![PathHashPair::file("y", "2")]));
        cache.save(&cache_file).unwrap();

        let cache = PathStateCache::load(&cache_file);
        assert_eq!(cache.get(&a).unwrap().get("x").unwrap().hash, "1");
        assert_eq!(cache.get(&b).unwrap().get("y").unwrap().hash, "2");
    }

    #[test]
    fn stale_cache_entry_is_not_trusted() {
        let dir = tempdir().unwrap();
        let cache_file = dir.path().join("path_states.json");
        let root = dir.path().join("root");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("real.txt"), "hello world").unwrap();
        let mut cache = PathStateCache::new();
        cache.set(&root, State::new(vec![PathHashPair::file("deleted.txt", "1")]));
        cache.save(&cache_file).unwrap();

        assert_eq!(PathStateCache::load(&cache_file).validated(&root), None);
    }

    #[test]
    fn cache_file_format_is_a_map_of_lists() {
        let mut cache = PathStateCache::new();
        cache.set(Path::new("/t"), State::new(vec![PathHashPair::file("a.txt", "h")]));
        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(json, serde_json::json!({ "/t": [ { "path": "a.txt", "hash": "h" } ] }));
    }
}
