//! Connection and transaction management
//!
//! The [`ConnectionManager`] owns the decision of where commit and rollback
//! boundaries fall. Callers run work through
//! [`ConnectionManager::with_managed_connection`]; during an upgrade run the
//! work shares one connection opened by
//! [`ConnectionManager::operation_starting`], and the returned
//! [`OperationScope`] releases it on every exit path.
//!
//! The manager is not re-entrant: an action must not call back into the
//! manager that is running it.

use crate::connection::{DbConnection, Driver};
use crate::duckdb::DuckDbDriver;
use crate::error::{DbError, DbResult};
use crate::sqlite::SqliteDriver;
use log::{debug, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use sw_core::{DatabaseConfig, DbType, TransactionMode};
use sw_sql::{DuckDbDialect, SqlDialect, SqliteDialect};

/// Shared connection state for one upgrade run
struct ActiveOperation {
    conn: Box<dyn DbConnection>,
    /// First managed call failure under `SingleTransaction`
    failure: Option<String>,
}

/// Connection/transaction manager shared by the journal and the executor
pub struct ConnectionManager {
    driver: Box<dyn Driver>,
    dialect: Box<dyn SqlDialect>,
    mode: TransactionMode,
    log_output: AtomicBool,
    operation: Mutex<Option<ActiveOperation>>,
}

impl ConnectionManager {
    /// Create a manager over a driver and dialect
    pub fn new(
        driver: Box<dyn Driver>,
        dialect: Box<dyn SqlDialect>,
        mode: TransactionMode,
    ) -> Self {
        Self {
            driver,
            dialect,
            mode,
            log_output: AtomicBool::new(false),
            operation: Mutex::new(None),
        }
    }

    /// Pick the driver and dialect for a configured database
    pub fn from_config(config: &DatabaseConfig, mode: TransactionMode) -> Self {
        match config.db_type {
            DbType::DuckDb => Self::new(
                Box::new(DuckDbDriver::new(config.path.clone())),
                Box::new(DuckDbDialect),
                mode,
            ),
            DbType::Sqlite => Self::new(
                Box::new(SqliteDriver::new(config.path.clone())),
                Box::new(SqliteDialect),
                mode,
            ),
        }
    }

    /// Dialect used for journal statements and splitting
    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    /// Transaction strategy chosen at construction
    pub fn transaction_mode(&self) -> TransactionMode {
        self.mode
    }

    /// Database type identifier of the driver
    pub fn db_type(&self) -> &'static str {
        self.driver.db_type()
    }

    /// Whether script commands run as queries with their output logged
    pub fn is_script_output_logged(&self) -> bool {
        self.log_output.load(Ordering::Relaxed)
    }

    /// Toggle script output logging
    pub fn set_script_output_logged(&self, enabled: bool) {
        self.log_output.store(enabled, Ordering::Relaxed);
    }

    /// Split preprocessed script text into executable commands
    pub fn split_script_into_commands(&self, text: &str) -> Vec<String> {
        self.dialect.split_commands(text)
    }

    /// Open a connection and run a trivial query, reporting any failure as text
    pub fn try_connect(&self) -> Result<(), String> {
        let mut conn = self.driver.open().map_err(|e| e.to_string())?;
        conn.query_scalar("SELECT 1")
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Begin an upgrade operation.
    ///
    /// Opens the shared connection and, under `SingleTransaction`, begins
    /// the ambient transaction. Only one operation may be active at a time.
    pub fn operation_starting(&self) -> DbResult<OperationScope<'_>> {
        let mut guard = self.lock_operation()?;
        if guard.is_some() {
            return Err(DbError::TransactionError(
                "an operation is already in progress".to_string(),
            ));
        }

        let mut conn = self.driver.open()?;
        if self.mode == TransactionMode::SingleTransaction {
            conn.begin()
                .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        }
        debug!(
            "Operation started on {} (transaction mode: {})",
            self.driver.db_type(),
            self.mode
        );
        *guard = Some(ActiveOperation {
            conn,
            failure: None,
        });

        Ok(OperationScope {
            manager: self,
            finished: false,
        })
    }

    /// Run `action` on a managed connection under the configured strategy.
    ///
    /// Inside an operation the shared connection is used; otherwise a
    /// transient connection is opened for this call alone. Under
    /// `SingleTransaction` any failed call dooms the operation, even when the
    /// caller recovers from the error, and its message is reported when the
    /// operation is completed.
    pub fn with_managed_connection<T, E, F>(&self, action: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn DbConnection) -> Result<T, E>,
        E: From<DbError> + fmt::Display,
    {
        let mut guard = self.lock_operation()?;
        if let Some(op) = guard.as_mut() {
            let result = self.run_scoped(op.conn.as_mut(), action);
            if let Err(err) = &result {
                if self.mode == TransactionMode::SingleTransaction && op.failure.is_none() {
                    op.failure = Some(err.to_string());
                }
            }
            return result;
        }
        drop(guard);

        let mut conn = self.driver.open()?;
        self.run_scoped(conn.as_mut(), action)
    }

    /// Apply the per-call transaction boundary, if the mode draws one
    fn run_scoped<T, E, F>(&self, conn: &mut dyn DbConnection, action: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn DbConnection) -> Result<T, E>,
        E: From<DbError>,
    {
        if self.mode != TransactionMode::PerScript {
            return action(conn);
        }

        conn.begin()
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        match action(conn) {
            Ok(value) => {
                if let Err(commit_err) = conn.commit() {
                    let _ = conn.rollback();
                    return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = conn.rollback() {
                    warn!("Rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Tear down the active operation, committing when asked and allowed
    fn finish_operation(&self, commit: bool) -> DbResult<()> {
        let taken = match self.operation.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut op) = taken else {
            return Ok(());
        };

        if self.mode != TransactionMode::SingleTransaction {
            return Ok(());
        }

        if commit && op.failure.is_none() {
            if let Err(commit_err) = op.conn.commit() {
                let _ = op.conn.rollback();
                return Err(DbError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
            debug!("Operation transaction committed");
            return Ok(());
        }

        if let Err(rollback_err) = op.conn.rollback() {
            warn!("Rollback failed: {rollback_err}");
        }
        if let (true, Some(cause)) = (commit, op.failure) {
            return Err(DbError::TransactionError(format!(
                "an earlier call in this operation failed; the transaction was rolled back: {cause}"
            )));
        }
        debug!("Operation transaction rolled back");
        Ok(())
    }

    fn lock_operation(&self) -> DbResult<MutexGuard<'_, Option<ActiveOperation>>> {
        self.operation
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }
}

/// Guard for an active operation.
///
/// [`OperationScope::complete`] commits (under `SingleTransaction`) and
/// releases the shared connection; dropping the scope without completing
/// it rolls back and releases.
#[must_use = "dropping the scope immediately ends the operation"]
pub struct OperationScope<'a> {
    manager: &'a ConnectionManager,
    finished: bool,
}

impl OperationScope<'_> {
    /// Finish the operation successfully
    pub fn complete(mut self) -> DbResult<()> {
        self.finished = true;
        self.manager.finish_operation(true)
    }
}

impl Drop for OperationScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.manager.finish_operation(false) {
            warn!("Failed to release operation: {e}");
        }
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
