//! Config command - Print the effective configuration.

use anyhow::Result;

use nextver_core::build_configuration;

use super::GlobalArgs;

pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let built = build_configuration(global.run_arguments()).await?;

    match &built.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Defaults (no configuration file found)"),
    }
    print!("{}", built.settings.to_toml()?);
    Ok(())
}
