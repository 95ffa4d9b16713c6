//! Script sources: where the available migration scripts come from.
//!
//! A [`ScriptSource`] hands the engine `{name, contents}` pairs in no
//! particular order; the engine sorts them by name before use.

use crate::error::{CoreError, CoreResult};
use crate::script::Script;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Supplies the scripts available to an upgrade run
pub trait ScriptSource: Send + Sync {
    /// Return every available script
    fn scripts(&self) -> CoreResult<Vec<Script>>;
}

/// A fixed, in-memory list of scripts
#[derive(Debug, Clone, Default)]
pub struct StaticScriptSource {
    scripts: Vec<Script>,
}

impl StaticScriptSource {
    /// Create a source that always returns `scripts`
    pub fn new(scripts: Vec<Script>) -> Self {
        Self { scripts }
    }
}

impl ScriptSource for StaticScriptSource {
    fn scripts(&self) -> CoreResult<Vec<Script>> {
        Ok(self.scripts.clone())
    }
}

/// Discovers `.sql` files under one or more directories.
///
/// Script names are the file path relative to its directory, with `/` as the
/// separator, so `migrations/2024/001_init.sql` is named `2024/001_init.sql`
/// when discovered recursively from `migrations`.
#[derive(Debug, Clone)]
pub struct FileSystemScriptSource {
    dirs: Vec<PathBuf>,
    recursive: bool,
}

impl FileSystemScriptSource {
    /// Create a source reading the top level of each directory
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            recursive: false,
        }
    }

    /// Also descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn discover(
        &self,
        root: &Path,
        dir: &Path,
        found: &mut HashMap<String, (PathBuf, Script)>,
    ) -> CoreResult<()> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })? {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            entries.push(entry.path());
        }
        entries.sort();

        for path in entries {
            if path.is_dir() {
                if self.recursive {
                    self.discover(root, &path, found)?;
                }
                continue;
            }
            if !path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("sql"))
            {
                continue;
            }

            let name = script_name_for(root, &path)?;
            let contents = read_script(&path)?;
            if let Some((existing, _)) = found.get(&name) {
                return Err(CoreError::DuplicateScript {
                    name,
                    path1: existing.display().to_string(),
                    path2: path.display().to_string(),
                });
            }
            log::debug!("Discovered script {} at {}", name, path.display());
            let script = Script::new(name.clone(), contents);
            found.insert(name, (path, script));
        }
        Ok(())
    }
}

impl ScriptSource for FileSystemScriptSource {
    fn scripts(&self) -> CoreResult<Vec<Script>> {
        let mut found = HashMap::new();
        for dir in &self.dirs {
            if !dir.is_dir() {
                return Err(CoreError::ScriptDirNotFound {
                    path: dir.display().to_string(),
                });
            }
            self.discover(dir, dir, &mut found)?;
        }
        Ok(found.into_values().map(|(_, script)| script).collect())
    }
}

/// Build the script name from the path relative to the discovery root.
fn script_name_for(root: &Path, path: &Path) -> CoreResult<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect();
    match parts {
        Some(parts) if !parts.is_empty() => Ok(parts.join("/")),
        _ => Err(CoreError::InvalidScriptName {
            path: path.display().to_string(),
        }),
    }
}

/// Read a script file, dropping a leading UTF-8 byte order mark.
fn read_script(path: &Path) -> CoreResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
