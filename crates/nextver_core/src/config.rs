//! Configuration loading.
//!
//! A [`VersionConfig`] is read from the first configuration file found while
//! walking up from the repository path, unless an explicit file is given.
//! Command-line overrides ([`RunArguments`]) are then merged on top to form
//! the [`BuiltConfig`] every other service works from.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::conventions::CommitConventions;
use crate::error::{VersionError, VersionResult};
use crate::version::{Increment, SemanticVersion};

/// File names probed in each directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["nextver.toml", ".nextver.toml", ".nextver.yml", ".nextver.yaml"];

/// How a branch rule adjusts the increment derived from commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchIncrement {
    /// Never bump on this branch.
    None,
    Patch,
    Minor,
    Major,
    /// Use whatever the commits ask for.
    #[default]
    Inherit,
}

impl BranchIncrement {
    /// Lower bound this rule places on the commit increment.
    pub fn floor(&self) -> Increment {
        match self {
            BranchIncrement::Patch => Increment::Patch,
            BranchIncrement::Minor => Increment::Minor,
            BranchIncrement::Major => Increment::Major,
            BranchIncrement::None | BranchIncrement::Inherit => Increment::None,
        }
    }
}

/// Branch-specific versioning rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRule {
    /// Regex matched against the branch name.
    pub name: String,
    /// Pre-release label, e.g. `beta` for `1.3.0-beta.4`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,
    #[serde(default)]
    pub increment: BranchIncrement,
}

impl BranchRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prerelease: None,
            increment: BranchIncrement::Inherit,
        }
    }

    pub fn prerelease(mut self, label: impl Into<String>) -> Self {
        self.prerelease = Some(label.into());
        self
    }

    pub fn increment(mut self, increment: BranchIncrement) -> Self {
        self.increment = increment;
        self
    }

    fn matcher(&self) -> VersionResult<Regex> {
        Regex::new(&self.name).map_err(|source| VersionError::Pattern {
            pattern: self.name.clone(),
            source,
        })
    }
}

/// On-disk version cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Relative paths are resolved against the `.git` directory.
    pub dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("nextver"),
        }
    }
}

/// Contents of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionConfig {
    pub tag_prefix: String,
    pub initial_version: String,
    pub commit_conventions: CommitConventions,
    pub branches: Vec<BranchRule>,
    pub cache: CacheSettings,
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            tag_prefix: "v".to_string(),
            initial_version: "0.1.0".to_string(),
            commit_conventions: CommitConventions::default(),
            branches: vec![
                BranchRule::new("^(main|master)$"),
                BranchRule::new("^develop$")
                    .prerelease("beta")
                    .increment(BranchIncrement::Minor),
                BranchRule::new("^release/").prerelease("rc"),
                BranchRule::new("^hotfix/")
                    .prerelease("hotfix")
                    .increment(BranchIncrement::Patch),
                BranchRule::new(".*").prerelease("alpha"),
            ],
            cache: CacheSettings::default(),
        }
    }
}

impl VersionConfig {
    /// Load from a file, choosing the format by extension.
    pub fn load(path: &Path) -> VersionResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => serde_yaml::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        config.validate().map_err(|e| VersionError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// First configuration file found walking up from `start`.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Resolve the configuration for `args`: explicit file, discovered file, or defaults.
    pub fn resolve(args: &RunArguments) -> VersionResult<(Self, Option<PathBuf>)> {
        let source = match &args.config_file {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(VersionError::Config(format!(
                        "Configuration file not found: {}",
                        explicit.display()
                    )));
                }
                Some(explicit.clone())
            }
            None => Self::discover(&args.path),
        };

        match source {
            Some(path) => {
                info!("Using configuration {}", path.display());
                Ok((Self::load(&path)?, Some(path)))
            }
            None => {
                debug!("No configuration file found, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok((config, None))
            }
        }
    }

    /// Check that every pattern compiles and the initial version parses.
    pub fn validate(&self) -> VersionResult<()> {
        self.initial_version.parse::<SemanticVersion>()?;
        self.commit_conventions.compile()?;
        for rule in &self.branches {
            rule.matcher()?;
        }
        Ok(())
    }

    pub fn initial(&self) -> VersionResult<SemanticVersion> {
        self.initial_version.parse()
    }

    /// First rule whose pattern matches `branch`.
    pub fn rule_for(&self, branch: &str) -> VersionResult<Option<&BranchRule>> {
        for rule in &self.branches {
            if rule.matcher()?.is_match(branch) {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }

    pub fn to_toml(&self) -> VersionResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Command-line input to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArguments {
    /// Repository path.
    pub path: PathBuf,
    pub config_file: Option<PathBuf>,
    /// Branch name override.
    pub branch: Option<String>,
    pub no_cache: bool,
}

impl RunArguments {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config_file: None,
            branch: None,
            no_cache: false,
        }
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }
}

/// Configuration with command-line overrides applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltConfig {
    pub repository: PathBuf,
    /// File the settings came from, if any.
    pub source: Option<PathBuf>,
    pub branch: Option<String>,
    pub settings: VersionConfig,
}

impl BuiltConfig {
    pub fn build(settings: VersionConfig, source: Option<PathBuf>, args: &RunArguments) -> Self {
        let mut settings = settings;
        if args.no_cache {
            settings.cache.enabled = false;
        }
        Self {
            repository: args.path.clone(),
            source,
            branch: args.branch.clone(),
            settings,
        }
    }

    /// SHA-256 over everything that influences the computed version.
    pub fn fingerprint(&self) -> VersionResult<String> {
        let inputs = serde_json::to_vec(&(
            &self.settings.tag_prefix,
            &self.settings.initial_version,
            &self.settings.commit_conventions,
            &self.settings.branches,
            &self.branch,
        ))?;
        let mut hasher = Sha256::new();
        hasher.update(&inputs);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
