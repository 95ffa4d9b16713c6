//! Error types for sw-core

use thiserror::Error;

/// Core error type for Stepwise
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Script directory not found
    #[error("[E004] Script directory not found: {path}")]
    ScriptDirNotFound { path: String },

    /// E005: Two scripts resolved to the same name
    #[error("[E005] Duplicate script name '{name}' in {path1} and {path2}")]
    DuplicateScript {
        name: String,
        path1: String,
        path2: String,
    },

    /// E006: Script name is empty or not valid UTF-8
    #[error("[E006] Invalid script name for '{path}'")]
    InvalidScriptName { path: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
