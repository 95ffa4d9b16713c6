//! Configuration types and parsing for stepwise.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main project configuration from stepwise.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directories containing migration scripts
    #[serde(default = "default_script_paths")]
    pub script_paths: Vec<String>,

    /// Whether script discovery descends into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where the journal table lives
    #[serde(default)]
    pub journal: JournalConfig,

    /// Schema substituted for the `$schema$` token in scripts
    #[serde(default)]
    pub schema: Option<String>,

    /// Transaction strategy for upgrade runs
    #[serde(default)]
    pub transaction: TransactionMode,

    /// Values for `$name$` tokens in scripts
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Whether `$name$` tokens are substituted
    #[serde(default = "default_true")]
    pub variables_enabled: bool,

    /// Whether the `$schema$` token is substituted
    #[serde(default = "default_true")]
    pub schema_token_enabled: bool,

    /// Create `schema` before running scripts if it does not exist
    #[serde(default)]
    pub ensure_schema: bool,

    /// Log rows returned by script statements
    #[serde(default)]
    pub log_script_output: bool,

    /// Named target configurations (e.g., dev, staging, prod)
    /// Each target can override database settings, schema and variables
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Schema override
    #[serde(default)]
    pub schema: Option<String>,

    /// Variable overrides (merged with base variables)
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// SQLite
    Sqlite,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or sqlite)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file path or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

/// Journal table location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    /// Schema holding the journal table (engine default when unset)
    #[serde(default)]
    pub schema: Option<String>,

    /// Journal table name
    #[serde(default = "default_journal_table")]
    pub table: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            schema: None,
            table: default_journal_table(),
        }
    }
}

/// Granularity at which commit/rollback boundaries are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// No transactions; every statement is durable once executed
    None,
    /// One transaction around the whole run
    #[serde(rename = "single", alias = "single_transaction")]
    SingleTransaction,
    /// One transaction per managed-connection call (per script)
    #[default]
    PerScript,
}

impl std::fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionMode::None => write!(f, "none"),
            TransactionMode::SingleTransaction => write!(f, "single"),
            TransactionMode::PerScript => write!(f, "per_script"),
        }
    }
}

/// Name of the journal table when none is configured
pub const DEFAULT_JOURNAL_TABLE: &str = "SchemaVersions";

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_script_paths() -> Vec<String> {
    vec!["migrations".to_string()]
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_journal_table() -> String {
    DEFAULT_JOURNAL_TABLE.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for stepwise.yml or stepwise.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("stepwise.yml");
        let yaml_path = dir.join("stepwise.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.script_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one script_paths entry must be specified".to_string(),
            });
        }

        if self.journal.table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "journal.table cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get absolute script paths relative to a project root
    pub fn script_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.script_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets
            .get(name)
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: format!(
                    "Target '{}' not found. Available targets: {}",
                    name,
                    self.available_targets().join(", ")
                ),
            })
    }

    /// Get database configuration, optionally applying target overrides
    ///
    /// If target is specified and exists, uses target's database config.
    /// Otherwise, uses the base database config.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Get schema, optionally applying target overrides
    pub fn get_schema(&self, target: Option<&str>) -> Option<&str> {
        target
            .and_then(|name| self.targets.get(name))
            .and_then(|tc| tc.schema.as_deref())
            .or(self.schema.as_deref())
    }

    /// Get merged variables, with target overrides taking precedence.
    pub fn get_merged_variables(&self, target: Option<&str>) -> HashMap<String, String> {
        let mut variables = self.variables.clone();
        if let Some(tc) = target.and_then(|name| self.targets.get(name)) {
            for (key, value) in &tc.variables {
                variables.insert(key.clone(), value.clone());
            }
        }
        variables
    }

    /// Resolve target from CLI flag or SW_TARGET environment variable
    ///
    /// Priority: CLI flag > SW_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var("SW_TARGET").ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
