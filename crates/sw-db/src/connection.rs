//! Native client traits
//!
//! A [`Driver`] opens connections to one configured database; a
//! [`DbConnection`] executes statements on it. Values come back as strings
//! because the engine only ever reads script names and logs output.

use crate::error::DbResult;

/// Column names and stringified rows returned by a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Row values; SQL NULL is rendered as `null`
    pub rows: Vec<Vec<String>>,
}

impl QueryOutput {
    /// First column of every row
    pub fn first_column(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }
}

/// A single open connection
///
/// Connections are used from one thread at a time and are moved into the
/// connection manager, hence `Send` without `Sync`.
pub trait DbConnection: Send {
    /// Execute a statement, binding `params` positionally when non-empty
    fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<()>;

    /// Run a statement and collect its result set
    fn query(&mut self, sql: &str) -> DbResult<QueryOutput>;

    /// Run every statement in `sql`, collecting each result set in order.
    ///
    /// Drivers that run a whole batch through one `query` keep the default.
    fn query_batch(&mut self, sql: &str) -> DbResult<Vec<QueryOutput>> {
        Ok(vec![self.query(sql)?])
    }

    /// First cell of the first row, if any
    fn query_scalar(&mut self, sql: &str) -> DbResult<Option<String>> {
        let output = self.query(sql)?;
        Ok(output.rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }

    /// Begin a transaction
    fn begin(&mut self) -> DbResult<()> {
        self.execute("BEGIN TRANSACTION", &[])
    }

    /// Commit the current transaction
    fn commit(&mut self) -> DbResult<()> {
        self.execute("COMMIT", &[])
    }

    /// Roll back the current transaction
    fn rollback(&mut self) -> DbResult<()> {
        self.execute("ROLLBACK", &[])
    }
}

/// Factory for connections to one database
pub trait Driver: Send + Sync {
    /// Open a new connection
    fn open(&self) -> DbResult<Box<dyn DbConnection>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
