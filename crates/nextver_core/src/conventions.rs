//! Commit message classification.
//!
//! Major patterns are matched against the whole message so that a
//! `BREAKING CHANGE:` footer counts; minor and patch patterns only look at the
//! subject line.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VersionError, VersionResult};
use crate::git::Commit;
use crate::version::Increment;

/// Regex lists per increment, as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConventions {
    pub major: Vec<String>,
    pub minor: Vec<String>,
    pub patch: Vec<String>,
}

impl Default for CommitConventions {
    fn default() -> Self {
        Self {
            major: vec![
                r"(?m)^BREAKING[ -]CHANGE:".to_string(),
                r"^\w+(\([^)]*\))?!:".to_string(),
            ],
            minor: vec![r"^feat(\([^)]*\))?:".to_string()],
            patch: vec![r"^(fix|perf)(\([^)]*\))?:".to_string()],
        }
    }
}

impl CommitConventions {
    pub fn compile(&self) -> VersionResult<CommitClassifier> {
        Ok(CommitClassifier {
            major: compile_all(&self.major)?,
            minor: compile_all(&self.minor)?,
            patch: compile_all(&self.patch)?,
        })
    }
}

fn compile_all(patterns: &[String]) -> VersionResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| VersionError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Compiled [`CommitConventions`].
#[derive(Debug, Clone)]
pub struct CommitClassifier {
    major: Vec<Regex>,
    minor: Vec<Regex>,
    patch: Vec<Regex>,
}

impl CommitClassifier {
    pub fn classify(&self, commit: &Commit) -> Increment {
        let message = commit.message();
        if self.major.iter().any(|re| re.is_match(&message)) {
            Increment::Major
        } else if self.minor.iter().any(|re| re.is_match(&commit.subject)) {
            Increment::Minor
        } else if self.patch.iter().any(|re| re.is_match(&commit.subject)) {
            Increment::Patch
        } else {
            Increment::None
        }
    }

    /// Largest increment over `commits`.
    pub fn classify_all<'a>(&self, commits: impl IntoIterator<Item = &'a Commit>) -> Increment {
        let mut largest = Increment::None;
        for commit in commits {
            let increment = self.classify(commit);
            debug!(sha = %commit.short_sha(), %increment, "Classified commit");
            largest = largest.max(increment);
            if largest == Increment::Major {
                break;
            }
        }
        largest
    }
}
