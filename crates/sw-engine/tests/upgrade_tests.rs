//! End-to-end upgrade tests against real DuckDB and SQLite databases

use std::fs;
use std::sync::Arc;
use sw_core::{
    DatabaseConfig, DbType, FileSystemScriptSource, Script, ScriptSource, StaticScriptSource,
    TransactionMode,
};
use sw_db::{ConnectionManager, DbResult};
use sw_engine::{EngineError, UpgradeEngine, UpgradeEngineBuilder, UpgradeState};

fn manager(db_type: DbType, mode: TransactionMode) -> Arc<ConnectionManager> {
    let config = DatabaseConfig {
        db_type,
        path: ":memory:".to_string(),
    };
    Arc::new(ConnectionManager::from_config(&config, mode))
}

fn scripts(pairs: &[(&str, &str)]) -> Box<dyn ScriptSource> {
    Box::new(StaticScriptSource::new(
        pairs
            .iter()
            .map(|(name, contents)| Script::new(*name, *contents))
            .collect(),
    ))
}

fn engine(manager: &Arc<ConnectionManager>, pairs: &[(&str, &str)]) -> UpgradeEngine {
    UpgradeEngineBuilder::new(Arc::clone(manager), scripts(pairs)).build()
}

fn scalar(manager: &ConnectionManager, sql: &str) -> Option<String> {
    let result: DbResult<Option<String>> =
        manager.with_managed_connection(|conn| conn.query_scalar(sql));
    result.unwrap()
}

fn table_count(manager: &ConnectionManager, table: &str) -> i64 {
    scalar(manager, &format!("SELECT COUNT(*) FROM {table}"))
        .unwrap()
        .parse()
        .unwrap()
}

fn table_exists(manager: &ConnectionManager, table: &str) -> bool {
    let sql = match manager.db_type() {
        "sqlite" => format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{table}'"
        ),
        _ => format!("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = '{table}'"),
    };
    scalar(manager, &sql).as_deref() != Some("0")
}

const ENGINES: [DbType; 2] = [DbType::DuckDb, DbType::Sqlite];

const TWO_SCRIPTS: &[(&str, &str)] = &[
    (
        "001_create_items.sql",
        "CREATE TABLE items (id INTEGER, name VARCHAR(50));\n",
    ),
    (
        "002_seed_items.sql",
        "INSERT INTO items VALUES (1, 'one');\n;\nINSERT INTO items VALUES (2, 'two');\n",
    ),
];

#[test]
fn test_second_run_is_a_no_op() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);

        let first = engine(&manager, TWO_SCRIPTS).perform_upgrade();
        assert!(first.successful, "{db_type}: {:?}", first.error);
        assert_eq!(first.scripts.len(), 2);

        let second = engine(&manager, TWO_SCRIPTS).perform_upgrade();
        assert!(second.successful);
        assert!(second.scripts.is_empty(), "{db_type}");

        assert_eq!(table_count(&manager, "items"), 2, "{db_type}");
        assert_eq!(table_count(&manager, "\"SchemaVersions\""), 2, "{db_type}");
    }
}

#[test]
fn test_journal_created_on_first_run() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let engine = engine(&manager, TWO_SCRIPTS);

        assert!(!table_exists(&manager, "SchemaVersions"));
        assert!(engine.executed_scripts().unwrap().is_empty());
        assert!(engine.is_upgrade_required().unwrap());

        let mut engine = engine;
        assert!(engine.perform_upgrade().successful);
        assert!(table_exists(&manager, "SchemaVersions"), "{db_type}");
        assert_eq!(
            engine.executed_scripts().unwrap(),
            vec!["001_create_items.sql", "002_seed_items.sql"]
        );
        assert!(!engine.is_upgrade_required().unwrap());
    }
}

#[test]
fn test_scripts_added_later_are_applied_alone() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        assert!(engine(&manager, &TWO_SCRIPTS[..1]).perform_upgrade().successful);

        let result = engine(&manager, TWO_SCRIPTS).perform_upgrade();
        assert!(result.successful, "{db_type}: {:?}", result.error);
        assert_eq!(result.scripts, vec!["002_seed_items.sql"]);
    }
}

#[test]
fn test_per_script_failure_keeps_earlier_scripts() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let mut engine = engine(
            &manager,
            &[
                ("001_ok.sql", "CREATE TABLE kept (id INTEGER)"),
                (
                    "002_bad.sql",
                    "CREATE TABLE half (id INTEGER);\n;\nINSERT INTO missing_table VALUES (1)",
                ),
                ("003_never.sql", "CREATE TABLE never (id INTEGER)"),
            ],
        );

        let result = engine.perform_upgrade();
        assert!(!result.successful);
        assert_eq!(result.state, UpgradeState::Failed);
        assert_eq!(result.scripts, vec!["001_ok.sql"]);
        assert_eq!(result.error_script.as_ref().unwrap(), "002_bad.sql");
        assert!(matches!(result.error, Some(EngineError::Execution { .. })));

        assert!(table_exists(&manager, "kept"), "{db_type}");
        assert!(!table_exists(&manager, "half"), "{db_type}: script rolled back");
        assert!(!table_exists(&manager, "never"), "{db_type}");
        assert_eq!(engine.executed_scripts().unwrap(), vec!["001_ok.sql"]);
    }
}

#[test]
fn test_single_transaction_failure_undoes_whole_run() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::SingleTransaction);
        let mut engine = engine(
            &manager,
            &[
                ("001_ok.sql", "CREATE TABLE first (id INTEGER)"),
                ("002_bad.sql", "INSERT INTO missing_table VALUES (1)"),
            ],
        );

        let result = engine.perform_upgrade();
        assert!(!result.successful);
        assert_eq!(result.scripts, vec!["001_ok.sql"]);

        assert!(!table_exists(&manager, "first"), "{db_type}");
        assert!(!table_exists(&manager, "SchemaVersions"), "{db_type}");
        assert!(engine.executed_scripts().unwrap().is_empty());
    }
}

#[test]
fn test_single_transaction_success_commits() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::SingleTransaction);
        let result = engine(&manager, TWO_SCRIPTS).perform_upgrade();
        assert!(result.successful, "{db_type}: {:?}", result.error);
        assert_eq!(table_count(&manager, "items"), 2, "{db_type}");
    }
}

#[test]
fn test_no_transaction_mode_keeps_partial_script() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::None);
        let result = engine(
            &manager,
            &[(
                "001_partial.sql",
                "CREATE TABLE partial (id INTEGER);\n;\nINSERT INTO missing_table VALUES (1)",
            )],
        )
        .perform_upgrade();

        assert!(!result.successful);
        assert!(table_exists(&manager, "partial"), "{db_type}");
    }
}

#[test]
fn test_mark_as_executed_journals_without_running() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let mut engine = engine(&manager, TWO_SCRIPTS);

        let result = engine.mark_as_executed();
        assert!(result.successful, "{db_type}: {:?}", result.error);
        assert!(!table_exists(&manager, "items"), "{db_type}");
        assert_eq!(engine.executed_scripts().unwrap().len(), 2);
        assert!(engine.perform_upgrade().scripts.is_empty());
    }
}

#[test]
fn test_variables_substituted_end_to_end() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let mut engine = UpgradeEngineBuilder::new(
            Arc::clone(&manager),
            scripts(&[(
                "001_settings.sql",
                "CREATE TABLE settings (env VARCHAR(10));\n;\nINSERT INTO settings VALUES ('$env$');",
            )]),
        )
        .variable("env", "staging")
        .build();

        assert!(engine.perform_upgrade().successful);
        assert_eq!(
            scalar(&manager, "SELECT env FROM settings").as_deref(),
            Some("staging")
        );
    }
}

#[test]
fn test_undefined_variable_fails_run() {
    let manager = manager(DbType::DuckDb, TransactionMode::PerScript);
    let result = engine(&manager, &[("001.sql", "SELECT '$missing$'")]).perform_upgrade();
    assert!(!result.successful);
    assert!(matches!(result.error, Some(EngineError::Preprocess { .. })));
}

#[test]
fn test_duckdb_schema_and_journal_schema() {
    let manager = manager(DbType::DuckDb, TransactionMode::PerScript);
    let mut engine = UpgradeEngineBuilder::new(
        Arc::clone(&manager),
        scripts(&[("001.sql", "CREATE TABLE $schema$.widgets (id INTEGER)")]),
    )
    .schema(Some("app".to_string()))
    .ensure_schema(true)
    .journal_table(sw_sql::JournalTable::new(
        Some("app".to_string()),
        "SchemaVersions",
    ))
    .build();

    let result = engine.perform_upgrade();
    assert!(result.successful, "{:?}", result.error);
    assert_eq!(table_count(&manager, "app.widgets"), 0);
    assert_eq!(table_count(&manager, "app.\"SchemaVersions\""), 1);
    assert!(engine.perform_upgrade().scripts.is_empty());
}

#[test]
fn test_sqlite_trigger_script() {
    let manager = manager(DbType::Sqlite, TransactionMode::PerScript);
    let result = engine(
        &manager,
        &[(
            "001_audit.sql",
            "CREATE TABLE t (id INTEGER);\nCREATE TABLE audit (id INTEGER);\n;\nCREATE TRIGGER t_audit AFTER INSERT ON t BEGIN\n  INSERT INTO audit VALUES (NEW.id);\nEND;\n;\nINSERT INTO t VALUES (42);",
        )],
    )
    .perform_upgrade();

    assert!(result.successful, "{:?}", result.error);
    assert_eq!(scalar(&manager, "SELECT id FROM audit").as_deref(), Some("42"));
}

#[test]
fn test_script_output_logging_runs_queries() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let mut engine = UpgradeEngineBuilder::new(
            Arc::clone(&manager),
            scripts(&[
                ("001.sql", "CREATE TABLE t (id INTEGER)"),
                ("002.sql", "INSERT INTO t VALUES (5)"),
                ("003.sql", "SELECT id FROM t"),
            ]),
        )
        .log_script_output(true)
        .build();

        let result = engine.perform_upgrade();
        assert!(result.successful, "{db_type}: {:?}", result.error);
        assert_eq!(table_count(&manager, "t"), 1);
    }
}

#[test]
fn test_script_output_logging_with_multi_statement_script() {
    for db_type in ENGINES {
        let manager = manager(db_type, TransactionMode::PerScript);
        let mut engine = UpgradeEngineBuilder::new(
            Arc::clone(&manager),
            scripts(&[(
                "001_products.sql",
                "CREATE TABLE products (id INTEGER, name VARCHAR(20));\nINSERT INTO products VALUES (1, 'bolt');\nINSERT INTO products VALUES (2, 'nut');\nSELECT name FROM products ORDER BY id;\n",
            )]),
        )
        .log_script_output(true)
        .build();

        let result = engine.perform_upgrade();
        assert!(result.successful, "{db_type}: {:?}", result.error);
        assert_eq!(result.scripts, vec!["001_products.sql"]);
        assert_eq!(table_count(&manager, "products"), 2, "{db_type}");
        assert_eq!(
            engine.executed_scripts().unwrap(),
            vec!["001_products.sql"],
            "{db_type}"
        );
    }
}

#[test]
fn test_file_backed_sqlite_with_script_directory() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir_all(migrations.join("2024")).unwrap();
    fs::write(
        migrations.join("001_users.sql"),
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    )
    .unwrap();
    fs::write(
        migrations.join("2024").join("002_seed.sql"),
        "INSERT INTO users (name) VALUES ('ada');",
    )
    .unwrap();
    fs::write(migrations.join("notes.txt"), "not a script").unwrap();

    let db_path = dir.path().join("app.db").to_string_lossy().to_string();
    let config = DatabaseConfig {
        db_type: DbType::Sqlite,
        path: db_path,
    };

    let run = || {
        let manager = Arc::new(ConnectionManager::from_config(
            &config,
            TransactionMode::PerScript,
        ));
        let source = FileSystemScriptSource::new(vec![migrations.clone()]).recursive(true);
        let mut engine = UpgradeEngineBuilder::new(Arc::clone(&manager), Box::new(source)).build();
        (engine.perform_upgrade(), manager)
    };

    let (first, manager) = run();
    assert!(first.successful, "{:?}", first.error);
    assert_eq!(first.scripts, vec!["001_users.sql", "2024/002_seed.sql"]);
    assert_eq!(table_count(&manager, "users"), 1);
    drop(manager);

    let (second, _) = run();
    assert!(second.successful);
    assert!(second.scripts.is_empty());
}

#[test]
fn test_try_connect_reports_unreachable_database() {
    let config = DatabaseConfig {
        db_type: DbType::Sqlite,
        path: "/nonexistent-dir/for/sure/app.db".to_string(),
    };
    let manager = Arc::new(ConnectionManager::from_config(
        &config,
        TransactionMode::PerScript,
    ));
    let mut engine = engine(&manager, TWO_SCRIPTS);

    assert!(engine.try_connect().is_err());
    let result = engine.perform_upgrade();
    assert!(matches!(result.error, Some(EngineError::Connectivity(_))));
}
