//! Error types for sw-engine

use sw_core::{CoreError, ScriptName};
use sw_db::DbError;
use sw_sql::SqlError;
use thiserror::Error;

/// Upgrade engine errors
///
/// A missing journal table is never an error; it reads as "no scripts
/// executed yet".
#[derive(Error, Debug)]
pub enum EngineError {
    /// U001: Could not open a connection to the target database
    #[error("[U001] Unable to connect to the database: {0}")]
    Connectivity(String),

    /// U002: A statement in a script failed
    #[error("[U002] Script '{script}' failed: {message}")]
    Execution { script: ScriptName, message: String },

    /// U003: The journal rejected a script before it ran
    #[error("[U003] Script '{script}' failed validation")]
    Validation { script: ScriptName },

    /// U004: A script ran but could not be recorded
    #[error("[U004] Failed to record script '{script}' in the journal: {message}")]
    JournalWrite { script: ScriptName, message: String },

    /// U005: The list of executed scripts could not be read
    #[error("[U005] Failed to read the journal: {0}")]
    JournalRead(String),

    /// U006: A preprocessor rejected the script text
    #[error("[U006] Script '{script}' could not be preprocessed: {source}")]
    Preprocess {
        script: ScriptName,
        #[source]
        source: SqlError,
    },

    /// U007: Available scripts could not be loaded
    #[error("[U007] Failed to load scripts: {0}")]
    Source(#[from] CoreError),

    /// U008: Beginning or committing the run failed
    #[error("[U008] Transaction failed: {0}")]
    Transaction(String),

    /// U009: The configured schema could not be created
    #[error("[U009] Failed to ensure schema '{schema}': {message}")]
    SchemaCreation { schema: String, message: String },
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Map a connection-manager failure outside any script's scope
    pub(crate) fn from_operation(err: DbError) -> Self {
        if err.is_connection() {
            EngineError::Connectivity(err.to_string())
        } else {
            EngineError::Transaction(err.to_string())
        }
    }

    /// Name of the script the error is attributed to, if any
    pub fn script(&self) -> Option<&ScriptName> {
        match self {
            EngineError::Execution { script, .. }
            | EngineError::Validation { script }
            | EngineError::JournalWrite { script, .. }
            | EngineError::Preprocess { script, .. } => Some(script),
            _ => None,
        }
    }
}
