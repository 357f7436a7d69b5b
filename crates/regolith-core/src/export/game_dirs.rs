//! Locating the game's `com.mojang` directory and its worlds

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const COM_MOJANG_ENV: &str = "COM_MOJANG";
const COM_MOJANG_PREVIEW_ENV: &str = "COM_MOJANG_PREVIEW";
const RELEASE_PACKAGE: &str = "Microsoft.MinecraftUWP_8wekyb3d8bbwe";
const PREVIEW_PACKAGE: &str = "Microsoft.MinecraftWindowsBeta_8wekyb3d8bbwe";

/// Where the release and preview editions keep their data.
///
/// Shared across async filter threads, hence `Send + Sync`.
pub trait GameDirectories: Send + Sync {
    fn com_mojang(&self) -> Result<PathBuf>;
    fn com_mojang_preview(&self) -> Result<PathBuf>;
}

/// Environment variables first, then the Windows package directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGameDirectories;

impl SystemGameDirectories {
    fn lookup(env: &str, package: &str) -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(env).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        if cfg!(windows) {
            if let Some(local) = dirs::data_local_dir() {
                let path = local
                    .join("Packages")
                    .join(package)
                    .join("LocalState")
                    .join("games")
                    .join("com.mojang");
                if path.is_dir() {
                    return Ok(path);
                }
            }
        }
        Err(Error::ComMojangNotFound {
            hint: Some(format!("\n  Set {env} to the com.mojang directory")),
        })
    }
}

impl GameDirectories for SystemGameDirectories {
    fn com_mojang(&self) -> Result<PathBuf> {
        Self::lookup(COM_MOJANG_ENV, RELEASE_PACKAGE)
    }

    fn com_mojang_preview(&self) -> Result<PathBuf> {
        Self::lookup(COM_MOJANG_PREVIEW_ENV, PREVIEW_PACKAGE)
    }
}

/// Every world under `com_mojang/minecraftWorlds` as (level name, dir).
///
/// Worlds without a readable `levelname.txt` are skipped.
pub fn list_worlds(com_mojang: &Path) -> Result<Vec<(String, PathBuf)>> {
    let worlds_dir = com_mojang.join("minecraftWorlds");
    let entries = match fs::read_dir(&worlds_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(regolith_fs::Error::io(&worlds_dir, e).into()),
    };
    let mut worlds = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| regolith_fs::Error::io(&worlds_dir, e))?;
        let dir = entry.path();
        match fs::read_to_string(dir.join("levelname.txt")) {
            Ok(name) => worlds.push((name.trim().to_string(), dir)),
            Err(e) => tracing::debug!("skipping world {}: {}", dir.display(), e),
        }
    }
    worlds.sort();
    Ok(worlds)
}

/// The single world whose level name is `name`.
pub fn find_world(com_mojang: &Path, name: &str) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = list_worlds(com_mojang)?
        .into_iter()
        .filter(|(level, _)| level == name)
        .map(|(_, dir)| dir)
        .collect();
    match matches.len() {
        0 => Err(Error::WorldNotFound {
            name: name.to_string(),
            path: com_mojang.join("minecraftWorlds"),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::AmbiguousWorld {
            name: name.to_string(),
            matches,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn world(com_mojang: &Path, folder: &str, name: &str) {
        let dir = com_mojang.join("minecraftWorlds").join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("levelname.txt"), name).unwrap();
    }

    #[test]
    fn finds_world_by_level_name() {
        let dir = tempdir().unwrap();
        world(dir.path(), "abc=", "My World");
        world(dir.path(), "def=", "Other");

        let found = find_world(dir.path(), "My World").unwrap();
        assert!(found.ends_with("abc="));
    }

    #[test]
    fn missing_and_duplicate_worlds() {
        let dir = tempdir().unwrap();
        world(dir.path(), "a", "Twin");
        world(dir.path(), "b", "Twin");

        assert!(matches!(find_world(dir.path(), "Nope"), Err(Error::WorldNotFound { .. })));
        assert!(matches!(
            find_world(dir.path(), "Twin"),
            Err(Error::AmbiguousWorld { ref matches, .. }) if matches.len() == 2
        ));
    }
}
