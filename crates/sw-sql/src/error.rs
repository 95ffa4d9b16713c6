//! Error types for sw-sql

use thiserror::Error;

/// Script text processing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// A `$name$` token has no value (S001)
    #[error("[S001] Variable '{name}' has no value defined")]
    UndefinedVariable { name: String },

    /// A user-supplied preprocessor rejected the script (S002)
    #[error("[S002] Script preprocessing failed: {0}")]
    PreprocessFailed(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
