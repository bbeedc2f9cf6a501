//! Typed channel registry.
//!
//! Channel identity is a zero-sized marker type implementing [`Event`]; the
//! marker fixes both the payload type and a stable name for logs. A [`Hub`]
//! is an explicit handle that lazily creates one [`Channel`] per marker, so
//! independent components agree on a channel simply by naming the same type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::fanout::Channel;
use crate::sink::{Payload, Source};

/// Identity of a named, typed channel.
pub trait Event: 'static {
    type Payload: Payload;
    const NAME: &'static str;
}

/// Declare an [`Event`] marker type.
///
/// ```rust
/// nextver_events::event! {
///     /// Emitted once the arguments are parsed.
///     pub ArgumentsParsed: Vec<String> = "arguments-parsed"
/// }
///
/// use nextver_events::Event;
/// assert_eq!(ArgumentsParsed::NAME, "arguments-parsed");
/// ```
#[macro_export]
macro_rules! event {
    ($(#[$meta:meta])* $vis:vis $name:ident: $payload:ty = $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::Event for $name {
            type Payload = $payload;
            const NAME: &'static str = $label;
        }
    };
}

/// Registry of channels keyed by event marker type.
#[derive(Default)]
pub struct Hub {
    channels: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel for `E`, created on first use.
    pub fn channel<E: Event>(&self) -> EventResult<Arc<Channel<E::Payload>>> {
        let entry = {
            let mut channels = self.channels.lock();
            let entry = channels.entry(TypeId::of::<E>()).or_insert_with(|| {
                debug!(event = E::NAME, "Creating channel");
                let channel: Arc<dyn Any + Send + Sync> = Arc::new(Channel::<E::Payload>::new(E::NAME));
                channel
            });
            Arc::clone(entry)
        };
        entry
            .downcast::<Channel<E::Payload>>()
            .map_err(|_| EventError::ChannelType(E::NAME))
    }

    /// The channel for `E` as a combinator source.
    pub fn source<E: Event>(&self) -> EventResult<Source<E::Payload>> {
        let source: Source<E::Payload> = self.channel::<E>()?;
        Ok(source)
    }

    /// Emit on `E` and await every handler the emission schedules.
    pub async fn emit<E: Event>(&self, value: E::Payload) -> EventResult<()> {
        let channel = self.channel::<E>()?;
        debug!(event = E::NAME, subscribers = channel.subscriber_count(), "Emitting");
        channel.emit(value).await
    }

    /// Number of channels created so far.
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("channels", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    event! {
        Numbers: i32 = "numbers"
    }

    event! {
        Words: String = "words"
    }

    #[test]
    fn test_channel_identity() {
        let hub = Hub::new();
        let a = hub.channel::<Numbers>().unwrap();
        let b = hub.channel::<Numbers>().unwrap();
        let words = hub.channel::<Words>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "numbers");
        assert_eq!(words.name(), "words");
        assert_eq!(hub.len(), 2);
    }

    #[tokio::test]
    async fn test_emit_through_hub() {
        let hub = Hub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        ops::on(&hub.source::<Words>().unwrap(), move |w| {
            sink_log.lock().push(w);
            Ok(())
        });

        hub.emit::<Words>("hello".to_string()).await.unwrap();
        hub.emit::<Numbers>(3).await.unwrap();

        assert_eq!(*log.lock(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_separate_hubs_are_isolated() {
        let left = Hub::new();
        let right = Hub::new();
        let log = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&log);
        ops::on_signal(&left.source::<Numbers>().unwrap(), move || {
            *counter.lock() += 1;
            Ok(())
        });

        right.emit::<Numbers>(1).await.unwrap();
        left.emit::<Numbers>(1).await.unwrap();
        assert_eq!(*log.lock(), 1);
    }
}
