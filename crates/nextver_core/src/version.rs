//! Semantic version value.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VersionError, VersionResult};

/// Size of a version change, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Increment {
    #[default]
    None,
    Patch,
    Minor,
    Major,
}

impl Increment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Increment::None => "none",
            Increment::Patch => "patch",
            Increment::Minor => "minor",
            Increment::Major => "major",
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-release suffix, e.g. `beta.4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prerelease {
    pub label: String,
    pub number: Option<u64>,
}

impl Ord for Prerelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label
            .cmp(&other.label)
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl PartialOrd for Prerelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "{}.{}", self.label, n),
            None => f.write_str(&self.label),
        }
    }
}

/// `MAJOR.MINOR.PATCH[-label[.N]][+build]`.
///
/// Build metadata is carried but ignored by equality and ordering. A release
/// orders after every pre-release of the same numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<Prerelease>,
    pub build: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a tag name, stripping `prefix` first when present.
    pub fn parse_tag(tag: &str, prefix: &str) -> VersionResult<Self> {
        tag.strip_prefix(prefix).unwrap_or(tag).parse()
    }

    /// The next version for `increment`. Pre-release and build are dropped.
    pub fn bump(&self, increment: Increment) -> Self {
        let (major, minor, patch) = match increment {
            Increment::None => (self.major, self.minor, self.patch),
            Increment::Patch => (self.major, self.minor, self.patch.saturating_add(1)),
            Increment::Minor => (self.major, self.minor.saturating_add(1), 0),
            Increment::Major => (self.major.saturating_add(1), 0, 0),
        };
        Self::new(major, minor, patch)
    }

    pub fn with_prerelease(mut self, label: impl Into<String>, number: u64) -> Self {
        self.prerelease = Some(Prerelease {
            label: label.into(),
            number: Some(number),
        });
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn parse_number(input: &str, part: &str, field: &str) -> VersionResult<u64> {
    if part.is_empty() {
        return Err(VersionError::invalid_version(input, format!("missing {field}")));
    }
    if part.len() > 1 && part.starts_with('0') {
        return Err(VersionError::invalid_version(input, format!("leading zero in {field}")));
    }
    part.parse()
        .map_err(|_| VersionError::invalid_version(input, format!("{field} is not a number")))
}

impl FromStr for SemanticVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (rest, build) = match trimmed.split_once('+') {
            Some((rest, build)) if !build.is_empty() => (rest, Some(build.to_string())),
            Some(_) => return Err(VersionError::invalid_version(input, "empty build metadata")),
            None => (trimmed, None),
        };

        let (numbers, prerelease) = match rest.split_once('-') {
            Some((numbers, pre)) => {
                let prerelease = match pre.rsplit_once('.') {
                    Some((label, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => Prerelease {
                        label: label.to_string(),
                        number: Some(parse_number(input, n, "pre-release number")?),
                    },
                    _ => Prerelease {
                        label: pre.to_string(),
                        number: None,
                    },
                };
                if prerelease.label.is_empty() {
                    return Err(VersionError::invalid_version(input, "empty pre-release label"));
                }
                (numbers, Some(prerelease))
            }
            None => (rest, None),
        };

        let mut parts = numbers.split('.');
        let major = parse_number(input, parts.next().unwrap_or_default(), "major")?;
        let minor = parse_number(input, parts.next().unwrap_or_default(), "minor")?;
        let patch = parse_number(input, parts.next().unwrap_or_default(), "patch")?;
        if parts.next().is_some() {
            return Err(VersionError::invalid_version(input, "too many components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SemanticVersion> for String {
    fn from(version: SemanticVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core().cmp(&other.core()).then_with(|| {
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
