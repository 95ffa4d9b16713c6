//! Stepwise CLI - apply versioned SQL migration scripts

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{mark, ping, status, up};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        Commands::Up(args) => up::execute(args, &cli.global),
        Commands::Status(args) => status::execute(args, &cli.global),
        Commands::Mark => mark::execute(&cli.global),
        Commands::Ping => ping::execute(&cli.global),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
                return std::process::ExitCode::from(u8::try_from(*code).unwrap_or(1));
            }
            eprintln!("Error: {err:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Install the logger: `info` by default, `debug` with `--verbose`,
/// `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
