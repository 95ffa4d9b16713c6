//! Ping command implementation

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::{load_context, ExitCode};

/// Execute the ping command
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let context = load_context(global)?;
    match context.manager.try_connect() {
        Ok(()) => {
            println!("Connected to {} database", context.manager.db_type());
            Ok(())
        }
        Err(message) => {
            eprintln!("Connection failed: {message}");
            Err(ExitCode(1).into())
        }
    }
}
