//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Stepwise - apply versioned SQL migration scripts exactly once
#[derive(Parser, Debug)]
#[command(name = "sw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending script
    Up(UpArgs),

    /// Show executed and pending scripts
    Status(StatusArgs),

    /// Record every pending script as executed without running it
    Mark,

    /// Check that the database can be reached
    Ping,
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
