//! Version calculation.
//!
//! 1. Start from the latest version tag, or `initial_version` when there is none.
//! 2. Bump by the largest commit increment since that tag, raised to the
//!    branch rule's floor. Commits that match no convention still bump the
//!    patch number, and a branch rule of `none` suppresses bumping entirely.
//! 3. Apply the branch's pre-release label, numbered by commits since the tag.
//!
//! HEAD sitting exactly on a tag yields that tag's version unchanged.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{BranchIncrement, BuiltConfig};
use crate::error::VersionResult;
use crate::git::GitSource;
use crate::version::{Increment, SemanticVersion};

/// Result of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: SemanticVersion,
    pub branch: String,
    pub head_sha: String,
    pub previous_tag: Option<String>,
    pub commits_since_tag: u64,
    pub increment: Increment,
}

/// Computes a [`VersionInfo`] from a built configuration and a repository.
pub struct VersionCalculator<'a> {
    config: &'a BuiltConfig,
    git: &'a dyn GitSource,
}

impl<'a> VersionCalculator<'a> {
    pub fn new(config: &'a BuiltConfig, git: &'a dyn GitSource) -> Self {
        Self { config, git }
    }

    pub async fn calculate(&self) -> VersionResult<VersionInfo> {
        let settings = &self.config.settings;

        let branch = match &self.config.branch {
            Some(branch) => branch.clone(),
            None => self.git.current_branch().await?,
        };
        let head_sha = self.git.head_sha().await?;
        let rule = settings.rule_for(&branch)?;
        let tag = self.git.latest_tag(&settings.tag_prefix).await?;
        let tag_name = tag.as_ref().map(|t| t.name.clone());

        let commits = self.git.commits_since(tag_name.clone()).await?;
        debug!(
            branch = %branch,
            tag = tag_name.as_deref().unwrap_or("<none>"),
            commits = commits.len(),
            "Collected history"
        );

        if let Some(tag) = &tag {
            if commits.is_empty() {
                info!("HEAD is tagged {}", tag.name);
                return Ok(VersionInfo {
                    version: tag.version.clone(),
                    branch,
                    head_sha,
                    previous_tag: Some(tag.name.clone()),
                    commits_since_tag: 0,
                    increment: Increment::None,
                });
            }
        }

        let branch_increment = rule.map(|r| r.increment).unwrap_or_default();
        let increment = match (&tag, branch_increment) {
            (_, BranchIncrement::None) => Increment::None,
            // The initial version already is the first release.
            (None, _) => Increment::None,
            (Some(_), floor) => {
                let classifier = settings.commit_conventions.compile()?;
                classifier
                    .classify_all(&commits)
                    .max(floor.floor())
                    .max(Increment::Patch)
            }
        };

        let base = match &tag {
            Some(tag) => tag.version.clone(),
            None => settings.initial()?,
        };
        let mut version = base.bump(increment);

        let commits_since_tag = self.git.commit_count(tag_name.clone()).await?;
        if let Some(label) = rule.and_then(|r| r.prerelease.as_deref()) {
            version = version.with_prerelease(label, commits_since_tag);
        }

        info!(%version, %increment, "Calculated version");
        Ok(VersionInfo {
            version,
            branch,
            head_sha,
            previous_tag: tag_name,
            commits_since_tag,
            increment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BranchRule, RunArguments, VersionConfig};
    use crate::git::{Commit, MockGitSource, Tag};
    use mockall::predicate::eq;

    fn built(branch: &str) -> BuiltConfig {
        BuiltConfig::build(VersionConfig::default(), None, &RunArguments::new("/repo").branch(branch))
    }

    fn tag(name: &str) -> Tag {
        Tag {
            name: name.to_string(),
            version: SemanticVersion::parse_tag(name, "v").unwrap(),
            sha: "tagsha".to_string(),
        }
    }

    fn mock_repo(latest: Option<Tag>, commits: Vec<Commit>) -> MockGitSource {
        let mut git = MockGitSource::new();
        let since = latest.as_ref().map(|t| t.name.clone());
        let count = commits.len() as u64;
        git.expect_head_sha().returning(|| Ok("headsha".to_string()));
        git.expect_latest_tag()
            .with(eq("v"))
            .returning(move |_| Ok(latest.clone()));
        git.expect_commits_since()
            .with(eq(since.clone()))
            .returning(move |_| Ok(commits.clone()));
        git.expect_commit_count()
            .with(eq(since))
            .returning(move |_| Ok(count));
        git
    }

    #[tokio::test]
    async fn test_head_on_tag_is_tag_version() {
        let git = mock_repo(Some(tag("v1.4.2")), Vec::new());
        let config = built("main");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "1.4.2");
        assert_eq!(info.previous_tag.as_deref(), Some("v1.4.2"));
        assert_eq!(info.commits_since_tag, 0);
    }

    #[tokio::test]
    async fn test_feature_commit_bumps_minor_on_main() {
        let commits = vec![
            Commit::new("c2", "fix: edge case", ""),
            Commit::new("c1", "feat: new flag", ""),
        ];
        let git = mock_repo(Some(tag("v1.4.2")), commits);
        let config = built("main");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "1.5.0");
        assert_eq!(info.increment, Increment::Minor);
        assert_eq!(info.head_sha, "headsha");
    }

    #[tokio::test]
    async fn test_unconventional_commits_bump_patch() {
        let git = mock_repo(Some(tag("v2.0.0")), vec![Commit::new("c1", "update readme", "")]);
        let config = built("main");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "2.0.1");
    }

    #[tokio::test]
    async fn test_branch_label_and_floor() {
        let commits = vec![
            Commit::new("c3", "fix: a", ""),
            Commit::new("c2", "fix: b", ""),
            Commit::new("c1", "chore: c", ""),
        ];
        let git = mock_repo(Some(tag("v1.0.0")), commits);
        let config = built("develop");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "1.1.0-beta.3");
        assert_eq!(info.commits_since_tag, 3);
    }

    #[tokio::test]
    async fn test_breaking_change_bumps_major() {
        let commits = vec![Commit::new("c1", "feat: x", "BREAKING CHANGE: removed y")];
        let git = mock_repo(Some(tag("v0.3.1")), commits);
        let config = built("release/1.0");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "1.0.0-rc.1");
    }

    #[tokio::test]
    async fn test_untagged_repository_uses_initial_version() {
        let git = mock_repo(None, vec![Commit::new("c1", "feat: start", "")]);
        let config = built("main");

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "0.1.0");
        assert_eq!(info.previous_tag, None);
    }

    #[tokio::test]
    async fn test_branch_rule_none_suppresses_bump() {
        let settings = VersionConfig {
            branches: vec![BranchRule::new(".*")
                .prerelease("snapshot")
                .increment(BranchIncrement::None)],
            ..Default::default()
        };
        let config = BuiltConfig::build(settings, None, &RunArguments::new("/repo").branch("any"));
        let git = mock_repo(Some(tag("v3.2.1")), vec![Commit::new("c1", "feat: x", "")]);

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.version.to_string(), "3.2.1-snapshot.1");
    }

    #[tokio::test]
    async fn test_branch_read_from_git_without_override() {
        let mut git = mock_repo(Some(tag("v1.0.0")), Vec::new());
        git.expect_current_branch()
            .times(1)
            .returning(|| Ok("main".to_string()));
        let config = BuiltConfig::build(VersionConfig::default(), None, &RunArguments::new("/repo"));

        let info = VersionCalculator::new(&config, &git).calculate().await.unwrap();
        assert_eq!(info.branch, "main");
    }
}
