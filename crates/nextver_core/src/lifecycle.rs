//! Run driver.
//!
//! Attaches a plugin set to a fresh [`Hub`], emits [`ArgumentsParsed`] and
//! waits for the event that answers the run.

use std::sync::Arc;

use nextver_events::{Cached, CompositeSubscription, Event, Hub};
use tracing::debug;

use crate::calculator::VersionInfo;
use crate::config::{BuiltConfig, RunArguments};
use crate::error::{VersionError, VersionResult};
use crate::events::{ArgumentsParsed, ConfigurationBuilt, VersionCalculated};
use crate::plugins::{default_plugins, ConfigPlugin, Plugin};

/// One run of the plugin graph.
pub struct Lifecycle {
    hub: Arc<Hub>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Lifecycle {
    /// A lifecycle with no plugins.
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Hub::new()),
            plugins: Vec::new(),
        }
    }

    /// A lifecycle with [`default_plugins`].
    pub fn standard() -> Self {
        Self {
            hub: Arc::new(Hub::new()),
            plugins: default_plugins(),
        }
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Emit `args` and return the first value emitted on `E`.
    pub async fn run<E: Event>(self, args: RunArguments) -> VersionResult<E::Payload> {
        let subscriptions = CompositeSubscription::new();
        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), "Attaching plugin");
            subscriptions.add(plugin.attach(&self.hub)?);
        }

        let answer = Cached::first(&self.hub.source::<E>()?);
        let outcome = self.hub.emit::<ArgumentsParsed>(Arc::new(args)).await;
        subscriptions.dispose();
        answer.detach();
        outcome?;

        answer
            .value()
            .ok_or_else(|| VersionError::Lifecycle(format!("run finished without emitting {}", E::NAME)))
    }

    /// Compute the version.
    pub async fn calculate(self, args: RunArguments) -> VersionResult<VersionInfo> {
        let info = self.run::<VersionCalculated>(args).await?;
        Ok(info.as_ref().clone())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and build the configuration only.
pub async fn build_configuration(args: RunArguments) -> VersionResult<BuiltConfig> {
    let built = Lifecycle::new()
        .with_plugin(ConfigPlugin)
        .run::<ConfigurationBuilt>(args)
        .await?;
    Ok(built.as_ref().clone())
}
