//! Tests against a real repository created with the `git` executable.
//!
//! Skipped when `git` is not installed.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use nextver_core::{GitCommand, GitSource, Lifecycle, RunArguments, SemanticVersion};

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "nextver")
        .env("GIT_AUTHOR_EMAIL", "nextver@example.com")
        .env("GIT_COMMITTER_NAME", "nextver")
        .env("GIT_COMMITTER_EMAIL", "nextver@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn commit(dir: &Path, message: &str) {
    git(dir, &["commit", "--allow-empty", "-q", "-m", message]);
}

async fn repository() -> Option<TempDir> {
    if !GitCommand::is_git_available().await {
        return None;
    }
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    commit(dir.path(), "chore: initial");
    Some(dir)
}

#[tokio::test]
async fn test_queries_on_real_repository() {
    let Some(dir) = repository().await else { return };
    git(dir.path(), &["tag", "v1.0.0"]);
    git(dir.path(), &["tag", "v0.9.0"]);
    git(dir.path(), &["tag", "not-a-version"]);
    commit(dir.path(), "feat: add pairing");
    commit(dir.path(), "fix: handle empty queue\n\nCloses #4");

    let repo = GitCommand::new(dir.path());
    assert_eq!(repo.current_branch().await.unwrap(), "main");
    assert_eq!(repo.head_sha().await.unwrap().len(), 40);

    let tag = repo.latest_tag("v").await.unwrap().unwrap();
    assert_eq!(tag.name, "v1.0.0");
    assert_eq!(tag.version, SemanticVersion::new(1, 0, 0));

    let commits = repo.commits_since(Some(tag.name.clone())).await.unwrap();
    let subjects: Vec<&str> = commits.iter().map(|c| c.subject.as_str()).collect();
    assert_eq!(subjects, vec!["fix: handle empty queue", "feat: add pairing"]);
    assert_eq!(commits[0].body, "Closes #4");

    assert_eq!(repo.commit_count(Some(tag.name)).await.unwrap(), 2);
    assert_eq!(repo.commit_count(None).await.unwrap(), 3);
    assert!(repo.git_dir().await.unwrap().ends_with(".git"));
}

#[tokio::test]
async fn test_untagged_repository_has_no_tag() {
    let Some(dir) = repository().await else { return };
    let repo = GitCommand::new(dir.path());
    assert_eq!(repo.latest_tag("v").await.unwrap(), None);
}

#[tokio::test]
async fn test_standard_lifecycle_on_real_repository() {
    let Some(dir) = repository().await else { return };
    git(dir.path(), &["tag", "v2.3.4"]);

    let args = RunArguments::new(dir.path());
    let tagged = Lifecycle::standard().calculate(args.clone()).await.unwrap();
    assert_eq!(tagged.version.to_string(), "2.3.4");

    git(dir.path(), &["checkout", "-q", "-b", "feature/zip"]);
    commit(dir.path(), "feat: zip");
    let feature = Lifecycle::standard().calculate(args).await.unwrap();
    assert_eq!(feature.version.to_string(), "2.4.0-alpha.1");
    assert!(dir.path().join(".git/nextver/version.json").exists());
}
