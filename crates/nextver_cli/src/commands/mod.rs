//! CLI command definitions.
//!
//! Each subcommand drives the core lifecycle with its own answer event.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nextver_core::RunArguments;

pub mod cache;
pub mod calculate;
pub mod config;

/// nextver - next semantic version from git history
#[derive(Parser)]
#[command(name = "nextver")]
#[command(version, about = "Calculate the next semantic version from git history")]
#[command(long_about = r#"
nextver derives the next semantic version of a repository from its latest
version tag, the conventional commits made since, and per-branch rules.

COMMANDS:
  calculate     → Print the next version (default)
  config        → Print the effective configuration as TOML
  cache clear   → Remove the cached version

CONFIGURATION:
  nextver.toml, .nextver.toml, .nextver.yml or .nextver.yaml, found by
  walking up from --path. Use --config to name a file explicitly.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Configuration error
  4 - Git error
  5 - Cache error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Repository path
    #[arg(short, long, global = true, default_value = ".", env = "NEXTVER_PATH")]
    pub path: PathBuf,

    /// Configuration file, bypassing discovery
    #[arg(short, long, global = true, env = "NEXTVER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            path: self.path.clone(),
            config: self.config.clone(),
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub path: PathBuf,
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn run_arguments(&self) -> RunArguments {
        let args = RunArguments::new(&self.path);
        match &self.config {
            Some(file) => args.config_file(file),
            None => args,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Calculate the next version (default)
    Calculate(calculate::CalculateArgs),

    /// Print the effective configuration
    Config,

    /// Manage the version cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove the cached version
    Clear,
}
