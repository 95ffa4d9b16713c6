//! sw-sql - SQL dialect layer for Stepwise
//!
//! This crate holds everything that is pure text: the per-engine journal
//! statements and identifier quoting, splitting a script into individually
//! executable commands, and the preprocessors that rewrite script text
//! before it runs.

pub mod dialect;
pub mod error;
pub mod preprocess;
pub mod splitter;

pub use dialect::{
    quote_literal, DuckDbDialect, JournalTable, PostgresDialect, SqlDialect, SqlServerDialect,
    SqliteDialect,
};
pub use error::{SqlError, SqlResult};
pub use preprocess::{
    apply_preprocessors, SchemaTokenPreprocessor, ScriptPreprocessor,
    VariableSubstitutionPreprocessor,
};
pub use splitter::{split_on_batch_separator, split_on_terminator};
