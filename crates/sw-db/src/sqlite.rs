//! SQLite driver

use crate::connection::{DbConnection, Driver, QueryOutput};
use crate::error::{DbError, DbResult};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, Statement};
use std::sync::Mutex;
use uuid::Uuid;

const MEMORY_PATH: &str = ":memory:";

/// SQLite driver
///
/// `:memory:` maps to a uniquely named shared-cache in-memory database so
/// that separate connections see the same data. An anchor connection held
/// by the driver keeps that database alive between connections.
pub struct SqliteDriver {
    path: String,
    memory_uri: Option<String>,
    anchor: Mutex<Option<Connection>>,
}

impl SqliteDriver {
    /// Create a driver for a database file, or `:memory:`
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let memory_uri = (path == MEMORY_PATH).then(|| {
            format!(
                "file:sw-{}?mode=memory&cache=shared",
                Uuid::new_v4().simple()
            )
        });
        Self {
            path,
            memory_uri,
            anchor: Mutex::new(None),
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

    fn connect(&self, target: &str) -> DbResult<Connection> {
        Connection::open(target).map_err(|e| DbError::ConnectionError(format!("{}: {e}", self.path)))
    }
}

impl Driver for SqliteDriver {
    fn open(&self) -> DbResult<Box<dyn DbConnection>> {
        let target = match &self.memory_uri {
            Some(uri) => {
                let mut anchor = self
                    .anchor
                    .lock()
                    .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
                if anchor.is_none() {
                    *anchor = Some(self.connect(uri)?);
                }
                uri.as_str()
            }
            None => self.path.as_str(),
        };
        let conn = self.connect(target)?;
        Ok(Box::new(SqliteConnection { conn }))
    }

    fn db_type(&self) -> &'static str {
        "sqlite"
    }
}

/// One SQLite connection
pub struct SqliteConnection {
    conn: Connection,
}

impl DbConnection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<()> {
        if params.is_empty() {
            self.conn.execute_batch(sql)?;
        } else {
            self.conn
                .execute(sql, rusqlite::params_from_iter(params.iter()))?;
        }
        Ok(())
    }

    fn query(&mut self, sql: &str) -> DbResult<QueryOutput> {
        Ok(self.query_batch(sql)?.pop().unwrap_or_default())
    }

    /// Statements are prepared one at a time from the batch tail, so later
    /// statements may refer to objects created by earlier ones.
    fn query_batch(&mut self, sql: &str) -> DbResult<Vec<QueryOutput>> {
        let mut outputs = Vec::new();
        let mut batch = Batch::new(&self.conn, sql);
        while let Some(mut stmt) = batch.next()? {
            if stmt.column_count() == 0 {
                stmt.execute([])?;
            } else {
                outputs.push(collect_output(&mut stmt)?);
            }
        }
        Ok(outputs)
    }
}

fn collect_output(stmt: &mut Statement<'_>) -> DbResult<QueryOutput> {
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let column_count = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..column_count)
                .map(|i| row.get_ref(i).map(value_to_string))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryOutput { columns, rows })
}

fn value_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "null".to_string(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => format!("<{} bytes>", blob.len()),
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;
