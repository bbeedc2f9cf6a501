//! Plugins wiring the services over the event hub.
//!
//! A plugin never calls another plugin. It declares which events it waits
//! for through the engine's combinators and emits its own event when done.

use std::sync::{Arc, Weak};

use nextver_events::{
    ops, Cached, CompositeSubscription, Event, EventResult, GateRescope, Hub, Replay, Source,
    Subscription,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStatus, VersionCache};
use crate::calculator::VersionCalculator;
use crate::config::{BuiltConfig, VersionConfig};
use crate::error::VersionError;
use crate::events::{
    ArgumentsParsed, CacheChecked, ConfigurationBuilt, ConfigurationCreated, GitCommandCreated,
    ServicesConfigured, VersionCalculated,
};
use crate::git::{GitCommand, GitSource};

/// A component that attaches its handlers to a [`Hub`].
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register handlers. Disposing the returned subscription detaches them
    /// together with every node built for them.
    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription>;
}

/// Services handed to the calculation.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<BuiltConfig>,
    pub git: Arc<dyn GitSource>,
    pub cache: Arc<CacheStatus>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// A `first` node on `E`, and the subscription that detaches it.
fn first_of<E: Event>(hub: &Hub) -> EventResult<(Source<E::Payload>, Subscription)> {
    let node = Cached::first(&hub.source::<E>()?);
    let source: Source<E::Payload> = node.clone();
    Ok((source, Subscription::new(move || node.detach())))
}

/// Group `handler` with the subscriptions of the nodes it listens to.
fn with_nodes(handler: Subscription, nodes: Subscription) -> Subscription {
    let group = CompositeSubscription::new();
    group.add(handler);
    group.add(nodes);
    Subscription::new(move || group.dispose())
}

fn upgrade(hub: &Weak<Hub>) -> Result<Arc<Hub>, VersionError> {
    hub.upgrade()
        .ok_or_else(|| VersionError::Lifecycle("event hub dropped during run".to_string()))
}

/// Loads the configuration once arguments are parsed.
#[derive(Debug, Default)]
pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn name(&self) -> &'static str {
        "config"
    }

    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription> {
        let (arguments, node) = first_of::<ArgumentsParsed>(hub)?;
        let hub = Arc::downgrade(hub);

        let handler = ops::on_async(&arguments, move |args| {
            let hub = hub.clone();
            async move {
                let hub = upgrade(&hub)?;
                let (settings, source) = VersionConfig::resolve(&args)?;
                hub.emit::<ConfigurationCreated>(Arc::new(settings.clone())).await?;

                let built = BuiltConfig::build(settings, source, &args);
                let fingerprint = built.fingerprint()?;
                debug!(%fingerprint, "Configuration built");
                hub.emit::<ConfigurationBuilt>(Arc::new(built)).await
            }
        });
        Ok(with_nodes(handler, node))
    }
}

type GitFactory = dyn Fn(&BuiltConfig) -> Arc<dyn GitSource> + Send + Sync;

/// Creates the repository accessor once the configuration is built.
pub struct GitPlugin {
    factory: Arc<GitFactory>,
}

impl GitPlugin {
    pub fn new() -> Self {
        Self::with_factory(|config: &BuiltConfig| {
            let git: Arc<dyn GitSource> = Arc::new(GitCommand::new(&config.repository));
            git
        })
    }

    /// Use `factory` instead of the `git` executable.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&BuiltConfig) -> Arc<dyn GitSource> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }
}

impl Default for GitPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for GitPlugin {
    fn name(&self) -> &'static str {
        "git"
    }

    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription> {
        let (built, node) = first_of::<ConfigurationBuilt>(hub)?;
        let factory = Arc::clone(&self.factory);
        let hub = Arc::downgrade(hub);

        let handler = ops::on_async(&built, move |config| {
            let hub = hub.clone();
            let git = factory(&config);
            async move {
                let hub = upgrade(&hub)?;
                hub.emit::<GitCommandCreated>(git).await
            }
        });
        Ok(with_nodes(handler, node))
    }
}

/// Looks up a cached version once both configuration and repository are known.
#[derive(Debug, Default)]
pub struct CachePlugin;

impl Plugin for CachePlugin {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription> {
        let ready = ops::zip(
            &hub.source::<ConfigurationBuilt>()?,
            &hub.source::<GitCommandCreated>()?,
        );
        let hub = Arc::downgrade(hub);

        Ok(ops::on_async(&ready, move |(config, git)| {
            let hub = hub.clone();
            async move {
                let hub = upgrade(&hub)?;
                let status = if config.settings.cache.enabled {
                    let head_sha = git.head_sha().await?;
                    let tag = git.latest_tag(&config.settings.tag_prefix).await?;
                    let key = CacheKey::new(head_sha, config.fingerprint()?)
                        .latest_tag(tag.map(|t| t.name));
                    let cache = VersionCache::in_git_dir(&git.git_dir().await?, &config.settings.cache.dir);
                    match cache.check(&key)? {
                        Some(info) => CacheStatus::Hit(info),
                        None => CacheStatus::Miss { cache, key },
                    }
                } else {
                    debug!("Version cache disabled");
                    CacheStatus::Disabled
                };
                hub.emit::<CacheChecked>(Arc::new(status)).await
            }
        }))
    }
}

/// Bundles the services for each cache check, replaying the built configuration.
#[derive(Debug, Default)]
pub struct ServicesPlugin;

impl Plugin for ServicesPlugin {
    fn name(&self) -> &'static str {
        "services"
    }

    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription> {
        // Same node as `ops::once_every_replay_first`, held so it can be detached.
        let gate = GateRescope::new(
            &hub.source::<CacheChecked>()?,
            hub.source::<ConfigurationBuilt>()?,
            Replay::First,
        );
        let checked: Source<(Arc<CacheStatus>, Arc<BuiltConfig>)> = gate.clone();
        let latest_git = Cached::latest(&hub.source::<GitCommandCreated>()?);
        let git = Arc::clone(&latest_git);
        let hub = Arc::downgrade(hub);

        let handler = ops::on_async(&checked, move |(cache, config)| {
            let hub = hub.clone();
            let git = git.value();
            async move {
                let hub = upgrade(&hub)?;
                let git = git.ok_or_else(|| {
                    VersionError::Lifecycle("cache checked before git command was created".to_string())
                })?;
                let services = Services { config, git, cache };
                hub.emit::<ServicesConfigured>(Arc::new(services)).await
            }
        });
        let nodes = Subscription::new(move || {
            gate.detach();
            latest_git.detach();
        });
        Ok(with_nodes(handler, nodes))
    }
}

/// Computes, or reuses, the version.
#[derive(Debug, Default)]
pub struct CalculationPlugin;

impl Plugin for CalculationPlugin {
    fn name(&self) -> &'static str {
        "calculation"
    }

    fn attach(&self, hub: &Arc<Hub>) -> EventResult<Subscription> {
        let services = hub.source::<ServicesConfigured>()?;
        let hub = Arc::downgrade(hub);

        Ok(ops::on_async(&services, move |services| {
            let hub = hub.clone();
            async move {
                let hub = upgrade(&hub)?;
                let info = match services.cache.as_ref() {
                    CacheStatus::Hit(info) => info.clone(),
                    CacheStatus::Miss { cache, key } => {
                        let info = VersionCalculator::new(&services.config, services.git.as_ref())
                            .calculate()
                            .await?;
                        if let Err(e) = cache.store(key, &info) {
                            warn!(error = %e, "Could not store version in cache");
                        }
                        info
                    }
                    CacheStatus::Disabled => {
                        VersionCalculator::new(&services.config, services.git.as_ref())
                            .calculate()
                            .await?
                    }
                };
                info!(version = %info.version, "Version calculated");
                hub.emit::<VersionCalculated>(Arc::new(info)).await
            }
        }))
    }
}

/// The plugin set used by the `nextver` binary.
pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(ConfigPlugin),
        Box::new(GitPlugin::new()),
        Box::new(CachePlugin),
        Box::new(ServicesPlugin),
        Box::new(CalculationPlugin),
    ]
}
