//! SQL dialect abstraction
//!
//! A dialect knows how one engine quotes identifiers, spells the journal
//! table's DDL and DML, and separates the statements of a script. It is pure
//! string construction; nothing here talks to a database.

use crate::splitter::{split_on_batch_separator, split_on_terminator};

/// Location of the journal table, fixed for the lifetime of a journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalTable {
    /// Schema holding the table; engine default when `None`
    pub schema: Option<String>,
    /// Table name
    pub table: String,
}

impl JournalTable {
    /// Create a journal table location
    pub fn new(schema: Option<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.filter(|s| !s.is_empty()),
            table: table.into(),
        }
    }
}

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String;

    /// Render `schema.table` (or just `table`) with quoting
    fn qualified_name(&self, journal: &JournalTable) -> String {
        match &journal.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_ident(schema),
                self.quote_ident(&journal.table)
            ),
            None => self.quote_ident(&journal.table),
        }
    }

    /// Text substituted for the `$schema$` token when a schema is configured
    fn schema_qualifier(&self, schema: &str) -> String {
        self.quote_ident(schema)
    }

    /// DDL creating the journal table
    fn create_journal_sql(&self, journal: &JournalTable) -> String;

    /// Query returning applied script names in ascending order
    fn executed_scripts_sql(&self, journal: &JournalTable) -> String {
        format!(
            "SELECT ScriptName FROM {} ORDER BY ScriptName",
            self.qualified_name(journal)
        )
    }

    /// Insert of one journal row, parameters bound in order `(script name, applied)`
    fn insert_journal_sql(&self, journal: &JournalTable) -> String;

    /// Catalog query counting tables that match the journal location.
    ///
    /// A catalog lookup never fails for a missing table, which matters on
    /// engines where any failed statement aborts the enclosing transaction.
    fn journal_exists_sql(&self, journal: &JournalTable) -> String {
        let schema = match &journal.schema {
            Some(schema) => quote_literal(schema),
            None => self.default_schema_expr().to_string(),
        };
        format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
            schema,
            quote_literal(&journal.table)
        )
    }

    /// SQL expression for the schema used when none is configured
    fn default_schema_expr(&self) -> &'static str {
        "current_schema()"
    }

    /// Statement creating `schema` if absent; `None` when the engine has no schemas
    fn create_schema_sql(&self, schema: &str) -> Option<String> {
        Some(format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.quote_ident(schema)
        ))
    }

    /// Split a preprocessed script into individually executable commands
    fn split_commands(&self, script: &str) -> Vec<String>;
}

/// Render a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_with_double_quotes(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Microsoft SQL Server dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn create_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "CREATE TABLE {} (\n    [Id] int identity(1,1) NOT NULL CONSTRAINT {} PRIMARY KEY,\n    [ScriptName] nvarchar(255) NOT NULL,\n    [Applied] datetime NOT NULL\n)",
            self.qualified_name(journal),
            self.quote_ident(&format!("PK_{}_Id", journal.table))
        )
    }

    fn insert_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "INSERT INTO {} (ScriptName, Applied) VALUES (@scriptName, @applied)",
            self.qualified_name(journal)
        )
    }

    fn default_schema_expr(&self) -> &'static str {
        "SCHEMA_NAME()"
    }

    fn create_schema_sql(&self, schema: &str) -> Option<String> {
        let create = format!("CREATE SCHEMA {}", self.quote_ident(schema));
        Some(format!(
            "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = N'{}') EXEC('{}')",
            schema.replace('\'', "''"),
            create.replace('\'', "''")
        ))
    }

    fn split_commands(&self, script: &str) -> Vec<String> {
        split_on_batch_separator(script, "GO")
    }
}

/// PostgreSQL dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_with_double_quotes(ident)
    }

    fn create_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "CREATE TABLE {} (\n    schemaversionsid serial NOT NULL,\n    scriptname character varying(255) NOT NULL,\n    applied timestamp without time zone NOT NULL,\n    CONSTRAINT {} PRIMARY KEY (schemaversionsid)\n)",
            self.qualified_name(journal),
            self.quote_ident(&format!("pk_{}_id", journal.table.to_lowercase()))
        )
    }

    fn insert_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "INSERT INTO {} (ScriptName, Applied) VALUES ($1, CAST($2 AS timestamp))",
            self.qualified_name(journal)
        )
    }

    fn split_commands(&self, script: &str) -> Vec<String> {
        split_on_terminator(script, true)
    }
}

/// SQLite dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_with_double_quotes(ident)
    }

    fn create_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "CREATE TABLE {} (\n    SchemaVersionID INTEGER CONSTRAINT {} PRIMARY KEY AUTOINCREMENT NOT NULL,\n    ScriptName TEXT NOT NULL,\n    Applied DATETIME NOT NULL\n)",
            self.qualified_name(journal),
            self.quote_ident(&format!("PK_{}_SchemaVersionID", journal.table))
        )
    }

    fn insert_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "INSERT INTO {} (ScriptName, Applied) VALUES (?1, ?2)",
            self.qualified_name(journal)
        )
    }

    fn journal_exists_sql(&self, journal: &JournalTable) -> String {
        let master = match &journal.schema {
            Some(schema) => format!("{}.sqlite_master", self.quote_ident(schema)),
            None => "sqlite_master".to_string(),
        };
        format!(
            "SELECT COUNT(*) FROM {} WHERE type = 'table' AND name = {}",
            master,
            quote_literal(&journal.table)
        )
    }

    /// SQLite has attached databases rather than schemas.
    fn create_schema_sql(&self, _schema: &str) -> Option<String> {
        None
    }

    /// A `;` alone on its line ends a batch, so trigger bodies stay whole.
    fn split_commands(&self, script: &str) -> Vec<String> {
        split_on_batch_separator(script, ";")
    }
}

/// DuckDB dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl SqlDialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_with_double_quotes(ident)
    }

    fn create_journal_sql(&self, journal: &JournalTable) -> String {
        format!(
            "CREATE TABLE {} (\n    SchemaVersionsId INTEGER PRIMARY KEY,\n    ScriptName VARCHAR(255) NOT NULL,\n    Applied TIMESTAMP NOT NULL\n)",
            self.qualified_name(journal)
        )
    }

    // DuckDB has no auto-increment column type; the next id is computed in
    // the insert itself, which is safe because runs are sequential.
    fn insert_journal_sql(&self, journal: &JournalTable) -> String {
        let table = self.qualified_name(journal);
        format!(
            "INSERT INTO {table} (SchemaVersionsId, ScriptName, Applied) \
             SELECT COALESCE(MAX(SchemaVersionsId), 0) + 1, CAST(? AS VARCHAR), CAST(? AS TIMESTAMP) FROM {table}"
        )
    }

    fn split_commands(&self, script: &str) -> Vec<String> {
        split_on_terminator(script, false)
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
