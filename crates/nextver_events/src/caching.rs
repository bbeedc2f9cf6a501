//! Value-caching nodes.
//!
//! A [`Cached`] node attaches to its upstream as soon as it is built and
//! remembers values according to its [`Retain`] policy:
//!
//! | Policy     | Stored value               | Fans out                    |
//! |------------|----------------------------|-----------------------------|
//! | `Latest`   | every value (overwrites)   | every value                 |
//! | `Earliest` | the first value only       | every value                 |
//! | `First`    | the first value only       | the first value, then never |
//!
//! The single emission a `First` node accepts is marked completing on the
//! [`EmitContext`], telling downstream combinators that this node is done.
//! After that the node lets go of its upstream.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::context::EmitContext;
use crate::error::EventResult;
use crate::fanout::{Inspect, Inspection, Node};
use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::{SerialSubscription, Subscription};

/// Which value a caching node keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    Latest,
    Earliest,
    First,
}

impl Retain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
            Self::First => "first",
        }
    }
}

/// Inspection hook that owns the cached value.
pub struct ValueHolder<T> {
    retain: Retain,
    value: Mutex<Option<T>>,
}

impl<T: Payload> ValueHolder<T> {
    fn new(retain: Retain) -> Self {
        Self {
            retain,
            value: Mutex::new(None),
        }
    }

    fn get(&self) -> Option<T> {
        self.value.lock().clone()
    }

    fn has_value(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Payload> Inspect<T> for ValueHolder<T> {
    fn inspect(&self, value: &T) -> Inspection {
        let mut slot = self.value.lock();
        match self.retain {
            Retain::Latest => {
                *slot = Some(value.clone());
                Inspection::Accept
            }
            Retain::Earliest => {
                if slot.is_none() {
                    *slot = Some(value.clone());
                }
                Inspection::Accept
            }
            Retain::First => {
                if slot.is_some() {
                    Inspection::Reject
                } else {
                    *slot = Some(value.clone());
                    Inspection::AcceptCompleting
                }
            }
        }
    }
}

/// A node that remembers a value from its upstream.
pub struct Cached<T> {
    node: Node<T, ValueHolder<T>>,
    upstream: SerialSubscription,
}

impl<T: Payload> Cached<T> {
    /// Attach a caching node to `source`.
    ///
    /// The node stays alive for as long as it is attached upstream.
    pub fn new(source: &Source<T>, retain: Retain) -> Arc<Self> {
        let cached = Arc::new(Self {
            node: Node::with_inspector(retain.as_str(), ValueHolder::new(retain)),
            upstream: SerialSubscription::new(),
        });
        let this = Arc::clone(&cached);
        let subscription = source.register(Sink::unschedulable(move |value: &T, ctx| {
            this.on_upstream(value, ctx)
        }));
        cached.upstream.set(subscription);
        cached
    }

    pub fn latest(source: &Source<T>) -> Arc<Self> {
        Self::new(source, Retain::Latest)
    }

    pub fn earliest(source: &Source<T>) -> Arc<Self> {
        Self::new(source, Retain::Earliest)
    }

    pub fn first(source: &Source<T>) -> Arc<Self> {
        Self::new(source, Retain::First)
    }

    fn on_upstream(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        self.node.fire(value, ctx)?;
        if self.retain() == Retain::First && self.has_value() {
            debug!("First value captured, detaching upstream");
            self.upstream.dispose();
        }
        Ok(())
    }

    pub fn retain(&self) -> Retain {
        self.node.inspector().retain
    }

    pub fn has_value(&self) -> bool {
        self.node.inspector().has_value()
    }

    pub fn value(&self) -> Option<T> {
        self.node.inspector().get()
    }

    /// Whether the node is still listening upstream.
    pub fn is_attached(&self) -> bool {
        self.upstream.is_active()
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.subscriber_count()
    }

    /// Register `sink` and immediately deliver the cached value to it, if any.
    pub fn register_replay(&self, sink: Sink<T>, ctx: &mut EmitContext) -> EventResult<Subscription> {
        let subscription = self.node.register(sink.clone());
        if let Some(value) = self.value() {
            sink.deliver(&value, ctx)?;
        }
        Ok(subscription)
    }

    /// [`register_replay`](Self::register_replay) as its own top-level emission.
    pub async fn subscribe_replay(&self, sink: Sink<T>) -> EventResult<Subscription> {
        let mut ctx = EmitContext::new();
        let subscription = self.register_replay(sink, &mut ctx)?;
        ctx.drain().await?;
        Ok(subscription)
    }

    /// Detach from upstream. The cached value remains readable.
    pub fn detach(&self) {
        self.upstream.dispose();
    }
}

impl<T: Payload> Emittable<T> for Cached<T> {
    fn register(&self, sink: Sink<T>) -> Subscription {
        self.node.register(sink)
    }
}
