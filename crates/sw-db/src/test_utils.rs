//! Shared test utilities for sw-db
//!
//! [`RecordingDriver`] is an in-memory fake that records every statement
//! sent to it and can be told to fail on chosen statements. Clones share
//! state, so a test keeps one clone for assertions and hands another to the
//! connection manager.

use crate::connection::{DbConnection, Driver, QueryOutput};
use crate::error::{DbError, DbResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// A connection was opened
    Open,
    /// `execute` with its bound parameters
    Execute { sql: String, params: Vec<String> },
    /// `query`
    Query(String),
    /// `begin`
    Begin,
    /// `commit`
    Commit,
    /// `rollback`
    Rollback,
}

#[derive(Default)]
struct RecordingState {
    events: Vec<Recorded>,
    failures: Vec<(String, String)>,
    missing_tables: Vec<String>,
    responses: Vec<(String, QueryOutput)>,
    refuse_connections: Option<String>,
    fail_commit: bool,
}

impl RecordingState {
    /// Error configured for a statement, if any; matched by substring
    fn error_for(&self, sql: &str) -> Option<DbError> {
        if let Some(fragment) = self.missing_tables.iter().find(|f| sql.contains(f.as_str())) {
            return Some(DbError::TableNotFound(format!("no such table: {fragment}")));
        }
        self.failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, message)| DbError::ExecutionError(message.clone()))
    }
}

/// Recording fake driver
#[derive(Clone, Default)]
pub struct RecordingDriver {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingDriver {
    /// Create a fake with no configured failures
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail any statement containing `fragment` with an execution error
    pub fn fail_on(&self, fragment: &str, message: &str) {
        self.state()
            .failures
            .push((fragment.to_string(), message.to_string()));
    }

    /// Report a missing table for any statement containing `fragment`
    pub fn missing_table(&self, fragment: &str) {
        self.state().missing_tables.push(fragment.to_string());
    }

    /// Stop reporting a table as missing
    pub fn create_table(&self, fragment: &str) {
        self.state().missing_tables.retain(|f| f != fragment);
    }

    /// Answer queries containing `fragment` with `output`
    pub fn respond(&self, fragment: &str, output: QueryOutput) {
        self.state().responses.push((fragment.to_string(), output));
    }

    /// Make every subsequent `open` fail
    pub fn refuse_connections(&self, message: &str) {
        self.state().refuse_connections = Some(message.to_string());
    }

    /// Make every `commit` fail
    pub fn fail_commits(&self) {
        self.state().fail_commit = true;
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<Recorded> {
        self.state().events.clone()
    }

    /// SQL of every `execute` call, in order
    pub fn executed(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                Recorded::Execute { sql, .. } => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// SQL of every `query` call, in order
    pub fn queried(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                Recorded::Query(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Transaction control calls only
    pub fn transaction_events(&self) -> Vec<Recorded> {
        self.state()
            .events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Recorded::Begin | Recorded::Commit | Recorded::Rollback
                )
            })
            .cloned()
            .collect()
    }

    /// Forget recorded events; configured failures stay
    pub fn clear(&self) {
        self.state().events.clear();
    }
}

impl Driver for RecordingDriver {
    fn open(&self) -> DbResult<Box<dyn DbConnection>> {
        let mut state = self.state();
        if let Some(message) = &state.refuse_connections {
            return Err(DbError::ConnectionError(message.clone()));
        }
        state.events.push(Recorded::Open);
        Ok(Box::new(RecordingConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }
}

struct RecordingConnection {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingConnection {
    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DbConnection for RecordingConnection {
    fn execute(&mut self, sql: &str, params: &[&str]) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Recorded::Execute {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        });
        match state.error_for(sql) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn query(&mut self, sql: &str) -> DbResult<QueryOutput> {
        let mut state = self.state();
        state.events.push(Recorded::Query(sql.to_string()));
        if let Some(err) = state.error_for(sql) {
            return Err(err);
        }
        Ok(state
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn begin(&mut self) -> DbResult<()> {
        self.state().events.push(Recorded::Begin);
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Recorded::Commit);
        if state.fail_commit {
            return Err(DbError::ExecutionError("commit refused".to_string()));
        }
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.state().events.push(Recorded::Rollback);
        Ok(())
    }
}
