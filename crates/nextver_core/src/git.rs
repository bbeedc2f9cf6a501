//! Git operations for version calculation.
//!
//! Repository access goes through the [`GitSource`] trait so that the
//! calculator and plugins can run against a mock. [`GitCommand`] is the real
//! implementation and shells out to the `git` binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{VersionError, VersionResult};
use crate::version::SemanticVersion;

const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';

/// Git commit information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub subject: String,
    pub body: String,
}

impl Commit {
    pub fn new(sha: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Subject and body, separated the way git stores them.
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(7)]
    }
}

/// A version tag reachable from HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub version: SemanticVersion,
    pub sha: String,
}

/// Read-only repository queries needed to compute a version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitSource: Send + Sync {
    /// Current branch name.
    async fn current_branch(&self) -> VersionResult<String>;

    /// Full sha of HEAD.
    async fn head_sha(&self) -> VersionResult<String>;

    /// Highest-versioned tag reachable from HEAD whose name starts with `prefix`.
    async fn latest_tag(&self, prefix: &str) -> VersionResult<Option<Tag>>;

    /// Commits after `since` up to HEAD, newest first. `None` means all of history.
    async fn commits_since(&self, since: Option<String>) -> VersionResult<Vec<Commit>>;

    /// Number of commits after `since` up to HEAD.
    async fn commit_count(&self, since: Option<String>) -> VersionResult<u64>;

    /// Absolute path of the `.git` directory.
    async fn git_dir(&self) -> VersionResult<PathBuf>;
}

/// [`GitSource`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCommand {
    repo_path: PathBuf,
}

impl GitCommand {
    /// Create a new Git wrapper for a repository.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Check if Git is available on the system.
    pub async fn is_git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: &[&str]) -> VersionResult<String> {
        debug!(?args, repo = %self.repo_path.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .await
            .map_err(|e| VersionError::Git(format!("Failed to run git {}: {}", args[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VersionError::Git(format!(
                "git {} failed: {}",
                args[0],
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn range(since: Option<&str>) -> String {
        match since {
            Some(tag) => format!("{tag}..HEAD"),
            None => "HEAD".to_string(),
        }
    }
}

#[async_trait]
impl GitSource for GitCommand {
    async fn current_branch(&self) -> VersionResult<String> {
        let branch = self.run(&["branch", "--show-current"]).await?.trim().to_string();
        if branch.is_empty() {
            return Err(VersionError::Git(
                "HEAD is detached; pass --branch to name the branch".to_string(),
            ));
        }
        Ok(branch)
    }

    async fn head_sha(&self) -> VersionResult<String> {
        Ok(self.run(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    async fn latest_tag(&self, prefix: &str) -> VersionResult<Option<Tag>> {
        let pattern = format!("{prefix}*");
        let listing = self
            .run(&["tag", "--merged", "HEAD", "--list", &pattern])
            .await?;

        let mut latest: Option<(String, SemanticVersion)> = None;
        for name in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match SemanticVersion::parse_tag(name, prefix) {
                Ok(version) => {
                    if latest.as_ref().map_or(true, |(_, best)| version > *best) {
                        latest = Some((name.to_string(), version));
                    }
                }
                Err(e) => warn!(tag = name, error = %e, "Ignoring tag that is not a version"),
            }
        }

        let Some((name, version)) = latest else {
            return Ok(None);
        };
        let rev = format!("{name}^{{commit}}");
        let sha = self.run(&["rev-parse", &rev]).await?.trim().to_string();
        Ok(Some(Tag { name, version, sha }))
    }

    async fn commits_since(&self, since: Option<String>) -> VersionResult<Vec<Commit>> {
        let range = Self::range(since.as_deref());
        let format = format!("--format=%H{FIELD_SEPARATOR}%s{FIELD_SEPARATOR}%b{RECORD_SEPARATOR}");
        let log = self.run(&["log", &format, &range]).await?;
        Ok(parse_log(&log))
    }

    async fn commit_count(&self, since: Option<String>) -> VersionResult<u64> {
        let range = Self::range(since.as_deref());
        let count = self.run(&["rev-list", "--count", &range]).await?;
        count
            .trim()
            .parse()
            .map_err(|_| VersionError::Git(format!("Unexpected rev-list output: {}", count.trim())))
    }

    async fn git_dir(&self) -> VersionResult<PathBuf> {
        let dir = self.run(&["rev-parse", "--absolute-git-dir"]).await?;
        Ok(PathBuf::from(dir.trim()))
    }
}

/// Parse `git log` output written with the separators above.
fn parse_log(log: &str) -> Vec<Commit> {
    log.split(RECORD_SEPARATOR)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(3, FIELD_SEPARATOR);
            let sha = fields.next()?.trim();
            let subject = fields.next().unwrap_or_default().trim();
            let body = fields.next().unwrap_or_default().trim();
            Some(Commit::new(sha, subject, body))
        })
        .collect()
}
