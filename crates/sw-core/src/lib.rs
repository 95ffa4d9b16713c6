//! sw-core - Core library for Stepwise
//!
//! This crate provides the shared types used across all Stepwise components:
//! migration scripts and their names, the script-source collaborators that
//! discover them, and `stepwise.yml` configuration parsing.

pub mod config;
pub mod error;
pub mod script;
pub mod script_name;
pub(crate) mod serde_helpers;
pub mod source;

pub use config::{
    Config, DatabaseConfig, DbType, JournalConfig, TargetConfig, TransactionMode,
    DEFAULT_JOURNAL_TABLE,
};
pub use error::{CoreError, CoreResult};
pub use script::{sort_scripts, Script};
pub use script_name::ScriptName;
pub use source::{FileSystemScriptSource, ScriptSource, StaticScriptSource};
