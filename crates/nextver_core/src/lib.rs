//! # nextver_core
//!
//! Version calculation services for nextver.
//!
//! Each service is small and knows nothing about the others. Plugins wire them
//! together over a [`nextver_events::Hub`], so the order of operations is
//! expressed entirely by which events each plugin waits for.
//!
//! ## Architecture
//!
//! - **Config**: file discovery, TOML/YAML loading, command-line overrides
//! - **Version**: semantic version value and increments
//! - **Conventions**: commit message classification
//! - **Git**: repository queries behind the [`GitSource`] trait
//! - **Calculator**: tag + commits + branch rule to version
//! - **Cache**: on-disk result cache keyed by head and configuration
//! - **Plugins/Lifecycle**: event wiring and the run driver

pub mod cache;
pub mod calculator;
pub mod config;
pub mod conventions;
pub mod error;
pub mod events;
pub mod git;
pub mod lifecycle;
pub mod plugins;
pub mod version;

// Re-export main types for convenience
pub use cache::{CacheKey, CacheStatus, VersionCache};
pub use calculator::{VersionCalculator, VersionInfo};
pub use config::{BranchIncrement, BranchRule, BuiltConfig, CacheSettings, RunArguments, VersionConfig};
pub use conventions::{CommitClassifier, CommitConventions};
pub use error::{VersionError, VersionResult};
pub use git::{Commit, GitCommand, GitSource, Tag};
pub use lifecycle::{build_configuration, Lifecycle};
pub use plugins::{
    default_plugins, CachePlugin, CalculationPlugin, ConfigPlugin, GitPlugin, Plugin, Services,
    ServicesPlugin,
};
pub use version::{Increment, Prerelease, SemanticVersion};
