//! Cache command - Manage the version cache.

use anyhow::Result;
use tracing::debug;

use nextver_core::{build_configuration, GitCommand, GitSource, VersionCache};

use super::GlobalArgs;

pub async fn clear(global: &GlobalArgs) -> Result<()> {
    let built = build_configuration(global.run_arguments()).await?;
    let git_dir = GitCommand::new(&built.repository).git_dir().await?;
    let cache = VersionCache::in_git_dir(&git_dir, &built.settings.cache.dir);
    debug!(path = %cache.path().display(), "Clearing version cache");

    if cache.clear()? {
        println!("Cleared {}", cache.path().display());
    } else {
        println!("No cached version at {}", cache.path().display());
    }
    Ok(())
}
