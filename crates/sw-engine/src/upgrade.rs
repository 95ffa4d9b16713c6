//! Upgrade orchestration
//!
//! [`UpgradeEngine`] diffs the scripts a [`ScriptSource`] offers against the
//! journal and runs the remainder in name order, stopping at the first
//! failure. No lock is taken on the journal: two processes upgrading the same
//! database at once is not supported.

use crate::error::{EngineError, EngineResult};
use crate::executor::ScriptExecutor;
use crate::journal::{Journal, TableJournal};
use log::{error, info};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use sw_core::{sort_scripts, Config, Script, ScriptName, ScriptSource, DEFAULT_JOURNAL_TABLE};
use sw_db::ConnectionManager;
use sw_sql::{JournalTable, ScriptPreprocessor};

/// Lifecycle of one upgrade run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    /// No run attempted yet
    Idle,
    /// A run is in progress
    Running,
    /// The last run applied every pending script
    Completed,
    /// The last run stopped at an error
    Failed,
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeState::Idle => write!(f, "idle"),
            UpgradeState::Running => write!(f, "running"),
            UpgradeState::Completed => write!(f, "completed"),
            UpgradeState::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of an upgrade run
#[derive(Debug)]
pub struct UpgradeResult {
    /// True when every pending script was applied
    pub successful: bool,
    /// Scripts applied in this run, in order, up to any failure
    pub scripts: Vec<ScriptName>,
    /// The error that stopped the run
    pub error: Option<EngineError>,
    /// The script being processed when the run stopped
    pub error_script: Option<ScriptName>,
    /// Terminal state, `Completed` or `Failed`
    pub state: UpgradeState,
}

impl UpgradeResult {
    fn completed(scripts: Vec<ScriptName>) -> Self {
        Self {
            successful: true,
            scripts,
            error: None,
            error_script: None,
            state: UpgradeState::Completed,
        }
    }

    fn failed(
        scripts: Vec<ScriptName>,
        error: EngineError,
        error_script: Option<ScriptName>,
    ) -> Self {
        Self {
            successful: false,
            scripts,
            error: Some(error),
            error_script,
            state: UpgradeState::Failed,
        }
    }
}

/// Applies pending scripts to a database
pub struct UpgradeEngine {
    manager: Arc<ConnectionManager>,
    source: Box<dyn ScriptSource>,
    journal: Box<dyn Journal>,
    executor: ScriptExecutor,
    variables: HashMap<String, String>,
    ensure_schema: bool,
    state: UpgradeState,
}

impl UpgradeEngine {
    /// State after the most recent run
    pub fn state(&self) -> UpgradeState {
        self.state
    }

    /// The connection manager shared by the journal and executor
    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Names already recorded in the journal
    pub fn executed_scripts(&self) -> EngineResult<Vec<ScriptName>> {
        self.journal.executed_scripts()
    }

    /// Available scripts not yet in the journal, in execution order
    pub fn scripts_to_execute(&self) -> EngineResult<Vec<Script>> {
        let mut available = self.source.scripts()?;
        sort_scripts(&mut available);

        let executed: HashSet<ScriptName> = self.journal.executed_scripts()?.into_iter().collect();
        Ok(available
            .into_iter()
            .filter(|script| !executed.contains(&script.name))
            .collect())
    }

    /// Whether any script is pending
    pub fn is_upgrade_required(&self) -> EngineResult<bool> {
        Ok(!self.scripts_to_execute()?.is_empty())
    }

    /// Check that the database can be reached
    pub fn try_connect(&self) -> Result<(), String> {
        self.manager.try_connect()
    }

    /// Run every pending script, stopping at the first failure
    pub fn perform_upgrade(&mut self) -> UpgradeResult {
        self.state = UpgradeState::Running;
        info!("Beginning database upgrade");
        let result = self.run(|engine, script| {
            if !engine.journal.validate_script(script) {
                return Err(EngineError::Validation {
                    script: script.name.clone(),
                });
            }
            engine.executor.execute(script, &engine.variables)?;
            engine.journal.store_executed_script(script)
        });
        self.finish(result, "Upgrade successful")
    }

    /// Record every pending script as applied without running it
    pub fn mark_as_executed(&mut self) -> UpgradeResult {
        self.state = UpgradeState::Running;
        info!("Marking pending scripts as executed");
        let result = self.run(|engine, script| {
            info!("Marking script '{}' as executed", script.name);
            engine.journal.store_executed_script(script)
        });
        self.finish(result, "Scripts marked as executed")
    }

    fn finish(&mut self, result: UpgradeResult, success_message: &str) -> UpgradeResult {
        match &result.error {
            Some(err) => error!("Upgrade failed: {err}"),
            None => info!("{success_message}"),
        }
        self.state = result.state;
        result
    }

    /// Shared run loop: diff, open the operation scope, apply `step` to each
    /// pending script in order.
    fn run<F>(&self, step: F) -> UpgradeResult
    where
        F: Fn(&Self, &Script) -> EngineResult<()>,
    {
        let pending = match self.scripts_to_execute() {
            Ok(pending) => pending,
            Err(err) => return UpgradeResult::failed(Vec::new(), err, None),
        };
        if pending.is_empty() {
            info!("No new scripts need to be executed - completing.");
            return UpgradeResult::completed(Vec::new());
        }

        let scope = match self.manager.operation_starting() {
            Ok(scope) => scope,
            Err(err) => {
                return UpgradeResult::failed(Vec::new(), EngineError::from_operation(err), None)
            }
        };

        if self.ensure_schema {
            if let Err(err) = self.executor.verify_schema() {
                return UpgradeResult::failed(Vec::new(), err, None);
            }
        }

        let mut applied = Vec::with_capacity(pending.len());
        for script in &pending {
            if let Err(err) = step(self, script) {
                return UpgradeResult::failed(applied, err, Some(script.name.clone()));
            }
            applied.push(script.name.clone());
        }

        if let Err(err) = scope.complete() {
            return UpgradeResult::failed(applied, EngineError::from_operation(err), None);
        }
        UpgradeResult::completed(applied)
    }
}

/// Assembles an [`UpgradeEngine`] from already-constructed collaborators
pub struct UpgradeEngineBuilder {
    manager: Arc<ConnectionManager>,
    source: Box<dyn ScriptSource>,
    journal: Option<Box<dyn Journal>>,
    journal_table: JournalTable,
    schema: Option<String>,
    variables: HashMap<String, String>,
    variables_enabled: bool,
    schema_token_enabled: bool,
    ensure_schema: bool,
    log_script_output: Option<bool>,
    preprocessors: Vec<Box<dyn ScriptPreprocessor>>,
}

impl UpgradeEngineBuilder {
    /// Start a builder over a connection manager and a script source
    pub fn new(manager: Arc<ConnectionManager>, source: Box<dyn ScriptSource>) -> Self {
        Self {
            manager,
            source,
            journal: None,
            journal_table: JournalTable::new(None, DEFAULT_JOURNAL_TABLE),
            schema: None,
            variables: HashMap::new(),
            variables_enabled: true,
            schema_token_enabled: true,
            ensure_schema: false,
            log_script_output: None,
            preprocessors: Vec::new(),
        }
    }

    /// Take journal location, schema, variables and flags from project config
    pub fn apply_config(self, config: &Config, target: Option<&str>) -> Self {
        self.journal_table(JournalTable::new(
            config.journal.schema.clone(),
            config.journal.table.clone(),
        ))
        .schema(config.get_schema(target).map(String::from))
        .variables(config.get_merged_variables(target))
        .variables_enabled(config.variables_enabled)
        .schema_token_enabled(config.schema_token_enabled)
        .ensure_schema(config.ensure_schema)
        .log_script_output(config.log_script_output)
    }

    /// Journal table location for the default table journal
    pub fn journal_table(mut self, table: JournalTable) -> Self {
        self.journal_table = table;
        self
    }

    /// Replace the default table journal
    pub fn journal(mut self, journal: Box<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Schema substituted for `$schema$`
    pub fn schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Replace all variables
    pub fn variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Add or overwrite one variable
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Toggle `$name$` substitution
    pub fn variables_enabled(mut self, enabled: bool) -> Self {
        self.variables_enabled = enabled;
        self
    }

    /// Toggle `$schema$` substitution
    pub fn schema_token_enabled(mut self, enabled: bool) -> Self {
        self.schema_token_enabled = enabled;
        self
    }

    /// Create the schema at the start of each run
    pub fn ensure_schema(mut self, enabled: bool) -> Self {
        self.ensure_schema = enabled;
        self
    }

    /// Log the rows returned by script commands
    pub fn log_script_output(mut self, enabled: bool) -> Self {
        self.log_script_output = Some(enabled);
        self
    }

    /// Add a preprocessor that runs after the built-in substitutions
    pub fn preprocessor(mut self, preprocessor: Box<dyn ScriptPreprocessor>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    /// Build the engine
    pub fn build(self) -> UpgradeEngine {
        if let Some(enabled) = self.log_script_output {
            self.manager.set_script_output_logged(enabled);
        }

        let journal = match self.journal {
            Some(journal) => journal,
            None => Box::new(TableJournal::new(
                Arc::clone(&self.manager),
                self.journal_table,
            )),
        };

        let mut executor = ScriptExecutor::new(Arc::clone(&self.manager))
            .with_schema(self.schema)
            .with_variables_enabled(self.variables_enabled)
            .with_schema_token_enabled(self.schema_token_enabled);
        for preprocessor in self.preprocessors {
            executor = executor.with_preprocessor(preprocessor);
        }

        UpgradeEngine {
            manager: self.manager,
            source: self.source,
            journal,
            executor,
            variables: self.variables,
            ensure_schema: self.ensure_schema,
            state: UpgradeState::Idle,
        }
    }
}

#[cfg(test)]
#[path = "upgrade_test.rs"]
mod tests;
