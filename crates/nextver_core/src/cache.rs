//! On-disk version cache.
//!
//! One JSON file holds the last computed [`VersionInfo`] together with the key
//! it was computed for. A lookup is a hit only when the head sha, the latest
//! version tag and the configuration fingerprint all match.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calculator::VersionInfo;
use crate::error::{VersionError, VersionResult};

const CACHE_FILE_NAME: &str = "version.json";

/// Identity of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub head_sha: String,
    /// Tagging HEAD changes the answer without moving it.
    #[serde(default)]
    pub latest_tag: Option<String>,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(head_sha: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            head_sha: head_sha.into(),
            latest_tag: None,
            fingerprint: fingerprint.into(),
        }
    }

    pub fn latest_tag(mut self, tag: Option<String>) -> Self {
        self.latest_tag = tag;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    computed_at: DateTime<Utc>,
    info: VersionInfo,
}

/// Version cache rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCache {
    dir: PathBuf,
}

impl VersionCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Resolve a configured cache directory against the `.git` directory.
    pub fn in_git_dir(git_dir: &Path, configured: &Path) -> Self {
        if configured.is_absolute() {
            Self::new(configured)
        } else {
            Self::new(git_dir.join(configured))
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    /// The cached version for `key`, if any.
    ///
    /// A corrupt file counts as a miss.
    pub fn check(&self, key: &CacheKey) -> VersionResult<Option<VersionInfo>> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cached version");
                return Ok(None);
            }
            Err(e) => {
                return Err(VersionError::Cache(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt version cache");
                return Ok(None);
            }
        };

        if entry.key != *key {
            debug!(cached = %entry.key.head_sha, "Cached version is stale");
            return Ok(None);
        }

        info!(version = %entry.info.version, computed_at = %entry.computed_at, "Using cached version");
        Ok(Some(entry.info))
    }

    /// Store `info` under `key`, replacing any previous entry.
    pub fn store(&self, key: &CacheKey, info: &VersionInfo) -> VersionResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            VersionError::Cache(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let entry = CacheEntry {
            key: key.clone(),
            computed_at: Utc::now(),
            info: info.clone(),
        };
        let json = serde_json::to_string_pretty(&entry)?;

        let path = self.path();
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|e| VersionError::Cache(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Stored version");
        Ok(())
    }

    /// Remove the cache file. Returns whether there was one.
    pub fn clear(&self) -> VersionResult<bool> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Cleared version cache at {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VersionError::Cache(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Outcome of looking up the cache before a calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Caching is turned off for this run.
    Disabled,
    /// Nothing usable is cached; store the result under `key`.
    Miss { cache: VersionCache, key: CacheKey },
    Hit(VersionInfo),
}

impl CacheStatus {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{Increment, SemanticVersion};
    use tempfile::TempDir;

    fn info(version: &str) -> VersionInfo {
        VersionInfo {
            version: version.parse().unwrap(),
            branch: "main".to_string(),
            head_sha: "abc".to_string(),
            previous_tag: Some("v1.0.0".to_string()),
            commits_since_tag: 2,
            increment: Increment::Minor,
        }
    }

    #[test]
    fn test_miss_when_empty() {
        let dir = TempDir::new().unwrap();
        let cache = VersionCache::new(dir.path().join("nextver"));
        assert_eq!(cache.check(&CacheKey::new("abc", "f")).unwrap(), None);
    }

    #[test]
    fn test_store_then_hit() {
        let dir = TempDir::new().unwrap();
        let cache = VersionCache::new(dir.path().join("nextver"));
        let key = CacheKey::new("abc", "f1");

        cache.store(&key, &info("1.1.0")).unwrap();
        let hit = cache.check(&key).unwrap().unwrap();
        assert_eq!(hit.version, SemanticVersion::new(1, 1, 0));
        assert!(!cache.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_key_mismatch_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = VersionCache::new(dir.path());
        cache.store(&CacheKey::new("abc", "f1"), &info("1.1.0")).unwrap();

        assert_eq!(cache.check(&CacheKey::new("def", "f1")).unwrap(), None);
        assert_eq!(cache.check(&CacheKey::new("abc", "f2")).unwrap(), None);

        let tagged = CacheKey::new("abc", "f1").latest_tag(Some("v1.1.0".to_string()));
        assert_eq!(cache.check(&tagged).unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = VersionCache::new(dir.path());
        fs::write(cache.path(), "{ not json").unwrap();

        assert_eq!(cache.check(&CacheKey::new("abc", "f")).unwrap(), None);
        cache.store(&CacheKey::new("abc", "f"), &info("2.0.0")).unwrap();
        assert!(cache.check(&CacheKey::new("abc", "f")).unwrap().is_some());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let cache = VersionCache::new(dir.path());
        assert!(!cache.clear().unwrap());

        cache.store(&CacheKey::new("abc", "f"), &info("1.0.1")).unwrap();
        assert!(cache.clear().unwrap());
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_directory_resolution() {
        let git_dir = Path::new("/repo/.git");
        assert_eq!(
            VersionCache::in_git_dir(git_dir, Path::new("nextver")).dir(),
            Path::new("/repo/.git/nextver")
        );
        assert_eq!(
            VersionCache::in_git_dir(git_dir, Path::new("/var/cache/nextver")).dir(),
            Path::new("/var/cache/nextver")
        );
    }
}
