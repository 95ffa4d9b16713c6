//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::load_context;

#[derive(Debug, Serialize)]
struct StatusReport {
    executed: Vec<String>,
    pending: Vec<String>,
}

/// Execute the status command
pub fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let context = load_context(global)?;
    let engine = context.engine();

    let executed = engine
        .executed_scripts()
        .context("Failed to read the journal")?;
    let pending = engine
        .scripts_to_execute()
        .context("Failed to determine pending scripts")?;

    let report = StatusReport {
        executed: executed.iter().map(|s| s.to_string()).collect(),
        pending: pending.iter().map(|s| s.name.to_string()).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Project: {}", context.config.name);
    println!("Executed ({}):", report.executed.len());
    for name in &report.executed {
        println!("  {name}");
    }
    println!("Pending ({}):", report.pending.len());
    for name in &report.pending {
        println!("  {name}");
    }
    Ok(())
}
