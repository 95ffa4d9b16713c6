//! Script executor: preprocess, split, and run one script

use crate::error::{EngineError, EngineResult};
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;
use sw_core::Script;
use sw_db::{ConnectionManager, DbResult, QueryOutput};
use sw_sql::{
    apply_preprocessors, SchemaTokenPreprocessor, ScriptPreprocessor,
    VariableSubstitutionPreprocessor,
};

/// Runs scripts through the preprocessing chain and the connection manager
pub struct ScriptExecutor {
    manager: Arc<ConnectionManager>,
    schema: Option<String>,
    variables_enabled: bool,
    schema_token_enabled: bool,
    preprocessors: Vec<Box<dyn ScriptPreprocessor>>,
}

impl ScriptExecutor {
    /// Create an executor with both substitutions enabled and no schema
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            schema: None,
            variables_enabled: true,
            schema_token_enabled: true,
            preprocessors: Vec::new(),
        }
    }

    /// Schema substituted for `$schema$`
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema.filter(|s| !s.is_empty());
        self
    }

    /// Toggle `$name$` variable substitution
    pub fn with_variables_enabled(mut self, enabled: bool) -> Self {
        self.variables_enabled = enabled;
        self
    }

    /// Toggle `$schema$` substitution
    pub fn with_schema_token_enabled(mut self, enabled: bool) -> Self {
        self.schema_token_enabled = enabled;
        self
    }

    /// Append a preprocessor, run after the built-in substitutions
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn ScriptPreprocessor>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    /// Configured schema, if any
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Apply the preprocessing chain without executing anything
    pub fn preprocess(
        &self,
        script: &Script,
        variables: &HashMap<String, String>,
    ) -> EngineResult<String> {
        let schema_token;
        let substitution;
        let mut chain: Vec<&dyn ScriptPreprocessor> = Vec::new();

        if self.schema_token_enabled {
            let qualifier = self
                .schema
                .as_deref()
                .map(|schema| self.manager.dialect().schema_qualifier(schema));
            schema_token = SchemaTokenPreprocessor::new(qualifier);
            chain.push(&schema_token);
        }
        if self.variables_enabled {
            substitution = VariableSubstitutionPreprocessor::new(variables);
            chain.push(&substitution);
        }
        for preprocessor in &self.preprocessors {
            chain.push(preprocessor.as_ref());
        }

        apply_preprocessors(&script.contents, &chain).map_err(|source| EngineError::Preprocess {
            script: script.name.clone(),
            source,
        })
    }

    /// Execute a script's commands in order through one managed call.
    ///
    /// The first failing command aborts the rest of the script.
    pub fn execute(
        &self,
        script: &Script,
        variables: &HashMap<String, String>,
    ) -> EngineResult<()> {
        let text = self.preprocess(script, variables)?;
        let commands = self.manager.split_script_into_commands(&text);
        let log_output = self.manager.is_script_output_logged();

        info!("Executing script '{}'", script.name);
        debug!("Script '{}' has {} command(s)", script.name, commands.len());

        let mut block = 0;
        let result: DbResult<()> = self.manager.with_managed_connection(|conn| {
            for (index, command) in commands.iter().enumerate() {
                block = index + 1;
                if log_output {
                    for output in conn.query_batch(command)? {
                        log_output_rows(&output);
                    }
                } else {
                    conn.execute(command, &[])?;
                }
            }
            Ok(())
        });

        result.map_err(|e| {
            error!("Script block number: {block}; Message: {e}");
            if e.is_connection() {
                EngineError::Connectivity(e.to_string())
            } else {
                EngineError::Execution {
                    script: script.name.clone(),
                    message: e.to_string(),
                }
            }
        })
    }

    /// Create the configured schema if it does not exist.
    ///
    /// A no-op without a schema or on engines that have no schemas.
    pub fn verify_schema(&self) -> EngineResult<()> {
        let Some(schema) = self.schema.as_deref() else {
            return Ok(());
        };
        let Some(sql) = self.manager.dialect().create_schema_sql(schema) else {
            debug!(
                "{} has no schemas; skipping creation of '{schema}'",
                self.manager.dialect().name()
            );
            return Ok(());
        };

        info!("Ensuring schema '{schema}' exists");
        self.manager
            .with_managed_connection(|conn| conn.execute(&sql, &[]))
            .map_err(|e| {
                if e.is_connection() {
                    EngineError::Connectivity(e.to_string())
                } else {
                    EngineError::SchemaCreation {
                        schema: schema.to_string(),
                        message: e.to_string(),
                    }
                }
            })
    }
}

fn log_output_rows(output: &QueryOutput) {
    if output.columns.is_empty() {
        return;
    }
    info!("{}", output.columns.join(" | "));
    for row in &output.rows {
        info!("{}", row.join(" | "));
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
