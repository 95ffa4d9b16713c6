//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sw_core::{Config, DatabaseConfig, FileSystemScriptSource};
use sw_db::ConnectionManager;
use sw_engine::{UpgradeEngine, UpgradeEngineBuilder};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: main.rs turns this into a process exit status, nothing is
        // printed for it.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Loaded project: configuration, resolved target, and the connection manager
pub(crate) struct ProjectContext {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) target: Option<String>,
    pub(crate) manager: Arc<ConnectionManager>,
}

impl ProjectContext {
    /// Build an upgrade engine over the project's script directories
    pub(crate) fn engine(&self) -> UpgradeEngine {
        let source = FileSystemScriptSource::new(self.config.script_paths_absolute(&self.root))
            .recursive(self.config.recursive);
        UpgradeEngineBuilder::new(Arc::clone(&self.manager), Box::new(source))
            .apply_config(&self.config, self.target.as_deref())
            .build()
    }
}

/// Load the project config and open a connection manager for the target
pub(crate) fn load_context(global: &GlobalArgs) -> Result<ProjectContext> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load project configuration")?;

    let target = Config::resolve_target(global.target.as_deref());
    let database = config
        .get_database_config(target.as_deref())
        .context("Failed to resolve database configuration")?;
    let database = resolve_database_path(&root, database);

    log::debug!(
        "Project '{}': {} database at {} (target: {})",
        config.name,
        database.db_type,
        database.path,
        target.as_deref().unwrap_or("default")
    );

    let manager = Arc::new(ConnectionManager::from_config(
        &database,
        config.transaction,
    ));
    Ok(ProjectContext {
        root,
        config,
        target,
        manager,
    })
}

/// Resolve a relative database file path against the project directory.
///
/// `:memory:` and absolute paths are returned unchanged.
pub(crate) fn resolve_database_path(root: &Path, mut database: DatabaseConfig) -> DatabaseConfig {
    if database.path != ":memory:" && Path::new(&database.path).is_relative() {
        database.path = root.join(&database.path).display().to_string();
    }
    database
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
