//! Journal: the record of scripts already applied to a database

use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use sw_core::{Script, ScriptName};
use sw_db::{ConnectionManager, DbError};
use sw_sql::JournalTable;

/// Format of the `Applied` column, always UTC
pub const APPLIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tracks which scripts have been applied
pub trait Journal: Send + Sync {
    /// Names of applied scripts in ascending order; empty when the journal
    /// does not exist yet
    fn executed_scripts(&self) -> EngineResult<Vec<ScriptName>>;

    /// Record a script as applied, creating the journal first if needed
    fn store_executed_script(&self, script: &Script) -> EngineResult<()>;

    /// Whether a script may run. No content checks are made, so every
    /// script passes.
    fn validate_script(&self, _script: &Script) -> bool {
        true
    }
}

/// Journal stored in a table of the target database
pub struct TableJournal {
    manager: Arc<ConnectionManager>,
    table: JournalTable,
    display_name: String,
}

impl TableJournal {
    /// Create a journal at `table`, using the manager's dialect
    pub fn new(manager: Arc<ConnectionManager>, table: JournalTable) -> Self {
        let display_name = manager.dialect().qualified_name(&table);
        Self {
            manager,
            table,
            display_name,
        }
    }

    /// Location of the journal table
    pub fn table(&self) -> &JournalTable {
        &self.table
    }

    /// Probe whether the journal table exists.
    ///
    /// Runs the dialect's catalog count. A missing relation or any other
    /// statement failure reads as "absent"; connection failures propagate.
    /// Under `SingleTransaction` a failed probe inside the run still dooms
    /// the transaction, and the probe's message is carried in the error
    /// reported when the run completes.
    pub fn table_exists(&self) -> EngineResult<bool> {
        let sql = self.manager.dialect().journal_exists_sql(&self.table);
        let probe = self
            .manager
            .with_managed_connection(|conn| conn.query_scalar(&sql));

        match probe {
            Ok(count) => Ok(count
                .and_then(|c| c.trim().parse::<i64>().ok())
                .is_some_and(|n| n > 0)),
            Err(DbError::TableNotFound(msg)) => {
                debug!("Journal probe found no table: {msg}");
                Ok(false)
            }
            Err(DbError::ExecutionError(msg)) => {
                debug!(
                    "Journal probe failed, treating {} as absent: {msg}",
                    self.display_name
                );
                Ok(false)
            }
            Err(e) if e.is_connection() => Err(EngineError::Connectivity(e.to_string())),
            Err(e) => Err(EngineError::JournalRead(e.to_string())),
        }
    }
}

impl Journal for TableJournal {
    fn executed_scripts(&self) -> EngineResult<Vec<ScriptName>> {
        info!("Fetching list of already executed scripts.");
        if !self.table_exists()? {
            info!(
                "The {} table could not be found. The database is assumed to be at version 0.",
                self.display_name
            );
            return Ok(Vec::new());
        }

        let sql = self.manager.dialect().executed_scripts_sql(&self.table);
        let output = self
            .manager
            .with_managed_connection(|conn| conn.query(&sql))
            .map_err(|e| {
                if e.is_connection() {
                    EngineError::Connectivity(e.to_string())
                } else {
                    EngineError::JournalRead(e.to_string())
                }
            })?;

        // Database collations may not match byte order
        let mut names: Vec<ScriptName> = output
            .first_column()
            .into_iter()
            .filter_map(ScriptName::try_new)
            .collect();
        names.sort();
        Ok(names)
    }

    fn store_executed_script(&self, script: &Script) -> EngineResult<()> {
        let write_error = |e: DbError| EngineError::JournalWrite {
            script: script.name.clone(),
            message: e.to_string(),
        };

        if !self.table_exists()? {
            info!("Creating the {} table", self.display_name);
            let ddl = self.manager.dialect().create_journal_sql(&self.table);
            self.manager
                .with_managed_connection(|conn| conn.execute(&ddl, &[]))
                .map_err(write_error)?;
            info!("The {} table has been created", self.display_name);
        }

        let sql = self.manager.dialect().insert_journal_sql(&self.table);
        let applied = Utc::now().format(APPLIED_FORMAT).to_string();
        self.manager
            .with_managed_connection(|conn| {
                conn.execute(&sql, &[script.name.as_str(), applied.as_str()])
            })
            .map_err(write_error)
    }
}

#[cfg(test)]
#[path = "journal_test.rs"]
mod tests;
