//! Mark command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_context, ExitCode};

/// Execute the mark command
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let context = load_context(global)?;
    let result = context.engine().mark_as_executed();

    for script in &result.scripts {
        println!("  Marked: {script}");
    }
    if let Some(error) = &result.error {
        eprintln!("Marking failed: {error}");
        return Err(ExitCode(1).into());
    }
    println!("Marked {} script(s) as executed", result.scripts.len());
    Ok(())
}
