//! Lifecycle events.
//!
//! Emitted in this order during a calculation:
//!
//! ```text
//! ArgumentsParsed ─► ConfigurationCreated ─► ConfigurationBuilt ─► GitCommandCreated
//!                                                   │                    │
//!                                                   └──── zip ───────────┴─► CacheChecked
//!                                                                              │
//!                    ConfigurationBuilt (replayed) ─────────────────────────────┴─► ServicesConfigured
//!                                                                                     │
//!                                                                                     └─► VersionCalculated
//! ```

use std::sync::Arc;

use nextver_events::event;

use crate::cache::CacheStatus;
use crate::calculator::VersionInfo;
use crate::config::{BuiltConfig, RunArguments, VersionConfig};
use crate::git::GitSource;
use crate::plugins::Services;

event! {
    /// Command-line arguments are available.
    pub ArgumentsParsed: Arc<RunArguments> = "arguments-parsed"
}

event! {
    /// Configuration as read from disk, before overrides.
    pub ConfigurationCreated: Arc<VersionConfig> = "configuration-created"
}

event! {
    pub ConfigurationBuilt: Arc<BuiltConfig> = "configuration-built"
}

event! {
    pub GitCommandCreated: Arc<dyn GitSource> = "git-command-created"
}

event! {
    pub CacheChecked: Arc<CacheStatus> = "cache-checked"
}

event! {
    /// Everything the calculation needs is ready.
    pub ServicesConfigured: Arc<Services> = "services-configured"
}

event! {
    pub VersionCalculated: Arc<VersionInfo> = "version-calculated"
}
