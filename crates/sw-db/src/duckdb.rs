//! DuckDB driver

use crate::connection::{DbConnection, Driver, QueryOutput};
use crate::error::{DbError, DbResult};
use duckdb::Connection;
use std::sync::Mutex;

const MEMORY_PATH: &str = ":memory:";

/// DuckDB driver
///
/// Every connection is a clone of one lazily opened root handle, so all
/// connections see the same database and an in-memory database lives as
/// long as the driver does.
pub struct DuckDbDriver {
    path: String,
    root: Mutex<Option<Connection>>,
}

impl DuckDbDriver {
    /// Create a driver for a database file, or `:memory:`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            root: Mutex::new(None),
        }
    }

    /// Create a driver for a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Configured database path
    pub fn path(&self) -> &str {
        &self.path
    }

    fn open_root(&self) -> DbResult<Connection> {
        let result = if self.path == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.path)
        };
        result.map_err(|e| DbError::ConnectionError(format!("{}: {e}", self.path)))
    }
}

impl Driver for DuckDbDriver {
    fn open(&self) -> DbResult<Box<dyn DbConnection>> {
        let mut root = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        if root.is_none() {
            *root = Some(self.open_root()?);
        }
        let conn = root
            .as_ref()
            .ok_or_else(|| DbError::Internal("DuckDB root connection missing".to_string()))?
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Box::new(DuckDbConnection { conn }))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// One DuckDB connection
pub struct DuckDbConnection {
    conn: Connection,
}

impl DbConnection for DuckDbConnection {
    fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<()> {
        if params.is_empty() {
            self.conn.execute_batch(sql)?;
        } else {
            self.conn
                .execute(sql, duckdb::params_from_iter(params.iter()))?;
        }
        Ok(())
    }

    fn query(&mut self, sql: &str) -> DbResult<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let (columns, rows) = execute_and_collect(&mut stmt)?;
        Ok(QueryOutput { columns, rows })
    }
}

/// Read a column value as a String, trying multiple DuckDB types.
///
/// DuckDB integer columns return `None` for `Option<String>`, so we try
/// String -> i64 -> f64 -> bool -> "null".
fn get_column_as_string(row: &duckdb::Row<'_>, idx: usize) -> String {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return s;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return n.to_string();
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return f.to_string();
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return b.to_string();
    }
    "null".to_string()
}

/// Run a prepared statement and collect `(column_names, rows)`.
///
/// DuckDB 1.4 panics on `stmt.column_count()` before execution, so rows are
/// collected via `query_map` first and column metadata is read afterwards.
fn execute_and_collect(stmt: &mut duckdb::Statement) -> DbResult<(Vec<String>, Vec<Vec<String>>)> {
    let rows: Vec<Vec<String>> = stmt
        .query_map([], |row| {
            let col_count = row.as_ref().column_count();
            Ok((0..col_count)
                .map(|i| get_column_as_string(row, i))
                .collect())
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let columns: Vec<String> = (0..stmt.column_count())
        .map(|i| stmt.column_name(i).map_or("?".to_string(), |v| v.to_string()))
        .collect();

    Ok((columns, rows))
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
