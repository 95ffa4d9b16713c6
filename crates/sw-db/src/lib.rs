//! sw-db - Database layer for Stepwise
//!
//! This crate provides the native client traits (`Driver`, `DbConnection`),
//! DuckDB and SQLite drivers, and the `ConnectionManager` that decides
//! where transaction boundaries fall during an upgrade.

pub mod connection;
pub mod duckdb;
pub mod error;
pub mod manager;
pub mod sqlite;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use connection::{DbConnection, Driver, QueryOutput};
pub use duckdb::DuckDbDriver;
pub use error::{DbError, DbResult};
pub use manager::{ConnectionManager, OperationScope};
pub use sqlite::SqliteDriver;
