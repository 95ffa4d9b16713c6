//! Up command implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use sw_engine::UpgradeResult;

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{load_context, ExitCode};

/// JSON report for one upgrade run
#[derive(Debug, Serialize)]
pub(crate) struct UpReport {
    pub(crate) status: String,
    pub(crate) scripts: Vec<String>,
    pub(crate) error: Option<String>,
    pub(crate) failed_script: Option<String>,
    pub(crate) elapsed_secs: f64,
    pub(crate) timestamp: DateTime<Utc>,
}

impl UpReport {
    pub(crate) fn from_result(result: &UpgradeResult, elapsed_secs: f64) -> Self {
        Self {
            status: result.state.to_string(),
            scripts: result.scripts.iter().map(|s| s.to_string()).collect(),
            error: result.error.as_ref().map(|e| e.to_string()),
            failed_script: result.error_script.as_ref().map(|s| s.to_string()),
            elapsed_secs,
            timestamp: Utc::now(),
        }
    }
}

/// Execute the up command
pub fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let context = load_context(global)?;
    let mut engine = context.engine();

    let start = Instant::now();
    let result = engine.perform_upgrade();
    let report = UpReport::from_result(&result, start.elapsed().as_secs_f64());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for script in &report.scripts {
            println!("  Applied: {script}");
        }
        println!();
        match (&report.error, &report.failed_script) {
            (Some(error), Some(script)) => println!("Upgrade failed at {script}: {error}"),
            (Some(error), None) => println!("Upgrade failed: {error}"),
            (None, _) if report.scripts.is_empty() => println!("Database is up to date"),
            (None, _) => println!(
                "Applied {} script{} in {:.2}s",
                report.scripts.len(),
                if report.scripts.len() == 1 { "" } else { "s" },
                report.elapsed_secs
            ),
        }
    }

    if !result.successful {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "up_test.rs"]
mod tests;
