//! End-to-end runs of the plugin graph against a mocked repository.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use tempfile::TempDir;

use nextver_core::{
    CachePlugin, CalculationPlugin, Commit, ConfigPlugin, GitPlugin, GitSource, Lifecycle,
    RunArguments, SemanticVersion, ServicesPlugin, Tag, VersionError, VersionResult,
};

mock! {
    pub Repo {}

    #[async_trait]
    impl GitSource for Repo {
        async fn current_branch(&self) -> VersionResult<String>;
        async fn head_sha(&self) -> VersionResult<String>;
        async fn latest_tag(&self, prefix: &str) -> VersionResult<Option<Tag>>;
        async fn commits_since(&self, since: Option<String>) -> VersionResult<Vec<Commit>>;
        async fn commit_count(&self, since: Option<String>) -> VersionResult<u64>;
        async fn git_dir(&self) -> VersionResult<PathBuf>;
    }
}

fn tagged_repo(git_dir: PathBuf, history_reads: usize) -> MockRepo {
    let mut repo = MockRepo::new();
    repo.expect_head_sha().returning(|| Ok("f00d".to_string()));
    repo.expect_git_dir().returning(move || Ok(git_dir.clone()));
    // Once for the cache key, then once per calculation.
    repo.expect_latest_tag().times(1 + history_reads).returning(|_| {
        Ok(Some(Tag {
            name: "v1.2.0".to_string(),
            version: SemanticVersion::new(1, 2, 0),
            sha: "beef".to_string(),
        }))
    });
    repo.expect_commits_since()
        .times(history_reads)
        .returning(|_| Ok(vec![Commit::new("c1", "feat: pairing", "")]));
    repo.expect_commit_count().times(history_reads).returning(|_| Ok(1));
    repo
}

fn lifecycle(repo: MockRepo) -> Lifecycle {
    let repo: Arc<dyn GitSource> = Arc::new(repo);
    Lifecycle::new()
        .with_plugin(ConfigPlugin)
        .with_plugin(GitPlugin::with_factory(move |_| Arc::clone(&repo)))
        .with_plugin(CachePlugin)
        .with_plugin(ServicesPlugin)
        .with_plugin(CalculationPlugin)
}

/// Test the full event chain from parsed arguments to a computed version.
#[tokio::test]
async fn test_calculates_version() {
    let workspace = TempDir::new().unwrap();
    let repo = tagged_repo(workspace.path().join(".git"), 1);

    let info = lifecycle(repo)
        .calculate(RunArguments::new(workspace.path()).branch("main"))
        .await
        .unwrap();

    assert_eq!(info.version.to_string(), "1.3.0");
    assert_eq!(info.previous_tag.as_deref(), Some("v1.2.0"));
    assert_eq!(info.head_sha, "f00d");
    assert!(workspace.path().join(".git/nextver/version.json").exists());
}

/// Test that a second run at the same head is served from the cache.
#[tokio::test]
async fn test_second_run_hits_cache() {
    let workspace = TempDir::new().unwrap();
    let args = RunArguments::new(workspace.path()).branch("develop");

    let first = lifecycle(tagged_repo(workspace.path().join(".git"), 1))
        .calculate(args.clone())
        .await
        .unwrap();
    // History must not be read again.
    let second = lifecycle(tagged_repo(workspace.path().join(".git"), 0))
        .calculate(args)
        .await
        .unwrap();

    assert_eq!(first.version.to_string(), "1.3.0-beta.1");
    assert_eq!(second, first);
}

/// Test that disabling the cache recomputes and writes nothing.
#[tokio::test]
async fn test_no_cache_recomputes() {
    let workspace = TempDir::new().unwrap();
    let args = RunArguments::new(workspace.path()).branch("main").no_cache(true);

    for _ in 0..2 {
        let mut repo = MockRepo::new();
        repo.expect_head_sha().returning(|| Ok("f00d".to_string()));
        repo.expect_git_dir().never();
        repo.expect_latest_tag().times(1).returning(|_| Ok(None));
        repo.expect_commits_since()
            .times(1)
            .returning(|_| Ok(vec![Commit::new("c1", "initial", "")]));
        repo.expect_commit_count().times(1).returning(|_| Ok(1));

        let info = lifecycle(repo).calculate(args.clone()).await.unwrap();
        assert_eq!(info.version.to_string(), "0.1.0");
    }
    assert!(!workspace.path().join(".git").exists());
}

/// Test that a repository failure reaches the caller as a git error.
#[tokio::test]
async fn test_git_failure_propagates() {
    let workspace = TempDir::new().unwrap();
    let mut repo = MockRepo::new();
    repo.expect_head_sha()
        .returning(|| Err(VersionError::Git("not a git repository".to_string())));

    let err = lifecycle(repo)
        .calculate(RunArguments::new(workspace.path()).branch("main"))
        .await
        .unwrap_err();

    assert!(matches!(err, VersionError::Git(ref msg) if msg.contains("not a git repository")));
}

/// Test that a configuration file next to the repository is honoured.
#[tokio::test]
async fn test_configuration_file_drives_calculation() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join("nextver.toml"),
        r#"
[[branches]]
name = ".*"
prerelease = "dev"

[cache]
enabled = false
"#,
    )
    .unwrap();
    let mut repo = MockRepo::new();
    repo.expect_current_branch().returning(|| Ok("topic".to_string()));
    repo.expect_head_sha().returning(|| Ok("f00d".to_string()));
    repo.expect_latest_tag().returning(|_| {
        Ok(Some(Tag {
            name: "v1.2.0".to_string(),
            version: SemanticVersion::new(1, 2, 0),
            sha: "beef".to_string(),
        }))
    });
    repo.expect_commits_since()
        .returning(|_| Ok(vec![Commit::new("c2", "fix: a", ""), Commit::new("c1", "fix: b", "")]));
    repo.expect_commit_count().returning(|_| Ok(2));

    let info = lifecycle(repo)
        .calculate(RunArguments::new(workspace.path()))
        .await
        .unwrap();

    assert_eq!(info.version.to_string(), "1.2.1-dev.2");
    assert_eq!(info.branch, "topic");
}

/// Test that tagging HEAD between runs is not answered from the cache.
#[tokio::test]
async fn test_tagging_head_invalidates_cache() {
    let workspace = TempDir::new().unwrap();
    let args = RunArguments::new(workspace.path()).branch("develop");

    let before = lifecycle(tagged_repo(workspace.path().join(".git"), 1))
        .calculate(args.clone())
        .await
        .unwrap();
    assert_eq!(before.version.to_string(), "1.3.0-beta.1");

    let git_dir = workspace.path().join(".git");
    let mut repo = MockRepo::new();
    repo.expect_head_sha().returning(|| Ok("f00d".to_string()));
    repo.expect_git_dir().returning(move || Ok(git_dir.clone()));
    repo.expect_latest_tag().times(2).returning(|_| {
        Ok(Some(Tag {
            name: "v1.3.0".to_string(),
            version: SemanticVersion::new(1, 3, 0),
            sha: "f00d".to_string(),
        }))
    });
    repo.expect_commits_since().times(1).returning(|_| Ok(Vec::new()));
    repo.expect_commit_count().returning(|_| Ok(0));

    let after = lifecycle(repo).calculate(args).await.unwrap();
    assert_eq!(after.version.to_string(), "1.3.0");
    assert_eq!(after.previous_tag.as_deref(), Some("v1.3.0"));
}
