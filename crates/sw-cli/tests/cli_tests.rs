//! End-to-end tests for the `sw` binary against file-backed SQLite projects

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled sw binary
fn sw_bin() -> String {
    env!("CARGO_BIN_EXE_sw").to_string()
}

/// Run `sw` in a project directory and return (stdout, stderr, success).
fn run_sw(project: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(sw_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("SW_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute sw with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

/// Create a project with a SQLite database and the given scripts
fn project(scripts: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("stepwise.yml"),
        "name: inventory\ndatabase:\n  type: sqlite\n  path: inventory.db\nvariables:\n  owner: ops\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("migrations")).unwrap();
    for (name, contents) in scripts {
        fs::write(dir.path().join("migrations").join(name), contents).unwrap();
    }
    dir
}

const SCRIPTS: &[(&str, &str)] = &[
    (
        "001_items.sql",
        "CREATE TABLE items (id INTEGER PRIMARY KEY, owner TEXT);",
    ),
    ("002_seed.sql", "INSERT INTO items (owner) VALUES ('$owner$');"),
];

#[test]
fn test_up_applies_then_reports_up_to_date() {
    let dir = project(SCRIPTS);

    let (stdout, stderr, success) = run_sw(dir.path(), &["up"]);
    assert!(success, "stdout: {stdout}\nstderr: {stderr}");
    assert!(stdout.contains("Applied: 001_items.sql"));
    assert!(stdout.contains("Applied: 002_seed.sql"));
    assert!(dir.path().join("inventory.db").exists());

    let (stdout, _, success) = run_sw(dir.path(), &["up"]);
    assert!(success);
    assert!(stdout.contains("Database is up to date"));
}

#[test]
fn test_up_json_report() {
    let dir = project(SCRIPTS);

    let (stdout, stderr, success) = run_sw(dir.path(), &["up", "--json"]);
    assert!(success, "stderr: {stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["status"], "completed");
    assert_eq!(report["scripts"].as_array().unwrap().len(), 2);
    assert!(report["error"].is_null());
}

#[test]
fn test_up_failure_exits_nonzero_with_failed_script() {
    let dir = project(&[
        ("001_ok.sql", "CREATE TABLE ok (id INTEGER);"),
        ("002_bad.sql", "INSERT INTO nowhere VALUES (1);"),
    ]);

    let (stdout, _, success) = run_sw(dir.path(), &["up", "--json"]);
    assert!(!success);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["status"], "failed");
    assert_eq!(report["scripts"][0], "001_ok.sql");
    assert_eq!(report["failed_script"], "002_bad.sql");
    assert!(report["error"].as_str().unwrap().contains("002_bad.sql"));
}

#[test]
fn test_status_lists_executed_and_pending() {
    let dir = project(&SCRIPTS[..1]);
    assert!(run_sw(dir.path(), &["up"]).2);
    fs::write(
        dir.path().join("migrations").join(SCRIPTS[1].0),
        SCRIPTS[1].1,
    )
    .unwrap();

    let (stdout, stderr, success) = run_sw(dir.path(), &["status", "--json"]);
    assert!(success, "stderr: {stderr}");
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["executed"], serde_json::json!(["001_items.sql"]));
    assert_eq!(status["pending"], serde_json::json!(["002_seed.sql"]));
}

#[test]
fn test_mark_then_up_runs_nothing() {
    let dir = project(SCRIPTS);

    let (stdout, _, success) = run_sw(dir.path(), &["mark"]);
    assert!(success);
    assert!(stdout.contains("Marked 2 script(s)"));

    let (stdout, _, success) = run_sw(dir.path(), &["up", "--json"]);
    assert!(success);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["scripts"], serde_json::json!([]));
}

#[test]
fn test_ping() {
    let dir = project(SCRIPTS);
    let (stdout, _, success) = run_sw(dir.path(), &["ping"]);
    assert!(success);
    assert!(stdout.contains("sqlite"));
}

#[test]
fn test_ping_unreachable_database_fails() {
    let dir = project(SCRIPTS);
    fs::write(
        dir.path().join("stepwise.yml"),
        "name: inventory\ndatabase:\n  type: sqlite\n  path: missing-dir/nested/inventory.db\n",
    )
    .unwrap();

    let (_, stderr, success) = run_sw(dir.path(), &["ping"]);
    assert!(!success);
    assert!(stderr.contains("Connection failed"));
}

#[test]
fn test_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, success) = run_sw(dir.path(), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Failed to load project configuration"));
}
