use super::*;
use sw_core::TransactionMode;
use sw_db::test_utils::RecordingDriver;
use sw_sql::{SqlError, SqlResult, SqlServerDialect, SqliteDialect};

fn setup() -> (Arc<ConnectionManager>, RecordingDriver) {
    let driver = RecordingDriver::new();
    let manager = Arc::new(ConnectionManager::new(
        Box::new(driver.clone()),
        Box::new(SqlServerDialect),
        TransactionMode::None,
    ));
    (manager, driver)
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_schema_token_removed_without_schema() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager);
    executor
        .execute(&Script::new("Test", "create $schema$.Table"), &HashMap::new())
        .unwrap();
    assert_eq!(driver.executed(), vec!["create Table"]);
}

#[test]
fn test_schema_token_uses_dialect_quoting() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager).with_schema(Some("foo".to_string()));
    executor
        .execute(&Script::new("Test", "create $schema$.Table"), &HashMap::new())
        .unwrap();
    assert_eq!(driver.executed(), vec!["create [foo].Table"]);
}

#[test]
fn test_schema_token_left_alone_when_disabled() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager)
        .with_schema(Some("foo".to_string()))
        .with_schema_token_enabled(false);
    executor
        .execute(&Script::new("Test", "create $schema$.Table"), &HashMap::new())
        .unwrap();
    assert_eq!(driver.executed(), vec!["create $schema$.Table"]);
}

#[test]
fn test_variable_substitution() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager);
    executor
        .execute(
            &Script::new("Test", "create $foo$.Table"),
            &vars(&[("foo", "bar")]),
        )
        .unwrap();
    assert_eq!(driver.executed(), vec!["create bar.Table"]);
}

#[test]
fn test_variable_substitution_disabled() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager).with_variables_enabled(false);
    executor
        .execute(
            &Script::new("Test", "create $foo$.Table"),
            &vars(&[("foo", "bar")]),
        )
        .unwrap();
    assert_eq!(driver.executed(), vec!["create $foo$.Table"]);
}

#[test]
fn test_undefined_variable_fails_before_execution() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager);
    let err = executor
        .execute(&Script::new("Test", "create $nope$.Table"), &HashMap::new())
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Preprocess {
            source: SqlError::UndefinedVariable { .. },
            ..
        }
    ));
    assert!(driver.events().is_empty(), "no connection opened");
}

#[test]
fn test_commands_run_in_order() {
    let (manager, driver) = setup();
    let executor = ScriptExecutor::new(manager);
    executor
        .execute(
            &Script::new("Test", "create table a (id int)\nGO\ncreate table b (id int)\nGO\n"),
            &HashMap::new(),
        )
        .unwrap();
    assert_eq!(
        driver.executed(),
        vec!["create table a (id int)", "create table b (id int)"]
    );
}

#[test]
fn test_failure_aborts_remaining_commands() {
    let (manager, driver) = setup();
    driver.fail_on("broken", "Incorrect syntax near 'broken'");
    let executor = ScriptExecutor::new(manager);

    let err = executor
        .execute(
            &Script::new("002_bad.sql", "select 1\nGO\nselect broken\nGO\nselect 3"),
            &HashMap::new(),
        )
        .unwrap_err();

    match err {
        EngineError::Execution { script, message } => {
            assert_eq!(script, "002_bad.sql");
            assert!(message.contains("Incorrect syntax"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(driver.executed(), vec!["select 1", "select broken"]);
}

#[test]
fn test_connection_failure_is_connectivity_error() {
    let (manager, driver) = setup();
    driver.refuse_connections("host not found");
    let executor = ScriptExecutor::new(manager);
    let err = executor
        .execute(&Script::new("Test", "select 1"), &HashMap::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Connectivity(_)));
}

#[test]
fn test_output_logging_uses_query() {
    let (manager, driver) = setup();
    manager.set_script_output_logged(true);
    let executor = ScriptExecutor::new(manager);
    executor
        .execute(&Script::new("Test", "select 1\nGO\nselect 2"), &HashMap::new())
        .unwrap();
    assert!(driver.executed().is_empty());
    assert_eq!(driver.queried(), vec!["select 1", "select 2"]);
}

struct Uppercase;

impl ScriptPreprocessor for Uppercase {
    fn process(&self, contents: &str) -> SqlResult<String> {
        Ok(contents.to_uppercase())
    }
}

#[test]
fn test_custom_preprocessor_runs_last() {
    let (manager, _driver) = setup();
    let executor = ScriptExecutor::new(manager).with_preprocessor(Box::new(Uppercase));
    let text = executor
        .preprocess(
            &Script::new("Test", "insert into $schema$.t values ('$v$')"),
            &vars(&[("v", "x")]),
        )
        .unwrap();
    assert_eq!(text, "INSERT INTO T VALUES ('X')");
}

#[test]
fn test_verify_schema_without_schema_is_noop() {
    let (manager, driver) = setup();
    ScriptExecutor::new(manager).verify_schema().unwrap();
    assert!(driver.events().is_empty());
}

#[test]
fn test_verify_schema_creates_schema() {
    let (manager, driver) = setup();
    ScriptExecutor::new(manager)
        .with_schema(Some("app".to_string()))
        .verify_schema()
        .unwrap();
    let executed = driver.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("CREATE SCHEMA [app]"));
}

#[test]
fn test_verify_schema_skipped_without_schema_support() {
    let driver = RecordingDriver::new();
    let manager = Arc::new(ConnectionManager::new(
        Box::new(driver.clone()),
        Box::new(SqliteDialect),
        TransactionMode::None,
    ));
    ScriptExecutor::new(manager)
        .with_schema(Some("app".to_string()))
        .verify_schema()
        .unwrap();
    assert!(driver.events().is_empty());
}

#[test]
fn test_verify_schema_failure() {
    let (manager, driver) = setup();
    driver.fail_on("CREATE SCHEMA", "denied");
    let err = ScriptExecutor::new(manager)
        .with_schema(Some("app".to_string()))
        .verify_schema()
        .unwrap_err();
    assert!(matches!(err, EngineError::SchemaCreation { ref schema, .. } if schema == "app"));
}
