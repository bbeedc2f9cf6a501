//! Calculate command - Print the next version.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use nextver_core::Lifecycle;

use super::GlobalArgs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The version alone
    #[default]
    Text,
    /// Version plus branch, tag and commit details
    Json,
}

#[derive(Args, Debug, Default)]
pub struct CalculateArgs {
    /// Branch name to version for, instead of the checked-out branch
    #[arg(short, long, env = "NEXTVER_BRANCH")]
    pub branch: Option<String>,

    /// Ignore and do not update the version cache
    #[arg(long)]
    pub no_cache: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn execute(global: &GlobalArgs, args: CalculateArgs) -> Result<()> {
    let mut run = global.run_arguments().no_cache(args.no_cache);
    if let Some(branch) = args.branch {
        run = run.branch(branch);
    }
    info!("Calculating version for {}", global.path.display());

    let version = Lifecycle::standard()
        .calculate(run)
        .await
        .context("Failed to calculate version")?;

    match args.format {
        OutputFormat::Text => println!("{}", version.version),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&version)?),
    }
    Ok(())
}
