//! nextver CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Configuration error
//! - 4: Git error
//! - 5: Cache error

use std::process::ExitCode;

use clap::Parser;
use nextver_core::VersionError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{CacheCommands, Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIG_ERROR: u8 = 3;
    pub const GIT_ERROR: u8 = 4;
    pub const CACHE_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCodes::INVALID_ARGS
            } else {
                ExitCodes::SUCCESS
            };
            return ExitCode::from(code);
        }
    };

    // Logs go to stderr so stdout carries only the result
    let default_directive = if cli.verbose {
        "nextver=debug,warn"
    } else if cli.quiet {
        "error"
    } else {
        "nextver=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let global = cli.global();
    let result = match cli.command {
        Some(Commands::Calculate(args)) => commands::calculate::execute(&global, args).await,
        None => commands::calculate::execute(&global, Default::default()).await,
        Some(Commands::Config) => commands::config::execute(&global).await,
        Some(Commands::Cache {
            command: CacheCommands::Clear,
        }) => commands::cache::clear(&global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<VersionError>() {
        Some(err) if err.is_config() => ExitCodes::CONFIG_ERROR,
        Some(VersionError::Git(_)) => ExitCodes::GIT_ERROR,
        Some(VersionError::Cache(_)) => ExitCodes::CACHE_ERROR,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
