//! Multicast primitives.
//!
//! [`FanOut`] keeps subscribers keyed by a monotonic id, so iteration order is
//! registration order. Each emission iterates a snapshot taken before the
//! first sink runs:
//!
//! - a sink registered during an emission does not receive that emission;
//! - a sink revoked during an emission still receives it if it was in the snapshot.
//!
//! The registry lock is never held while a sink runs, so sinks may register
//! and revoke freely. A failing sink aborts the rest of the snapshot and the
//! error propagates to whoever drove the emission.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::context::EmitContext;
use crate::error::EventResult;
use crate::sink::{Emittable, Payload, Sink};
use crate::subscription::Subscription;

struct Registry<T> {
    next_id: u64,
    entries: BTreeMap<u64, Sink<T>>,
}

/// Ordered subscriber set with snapshot delivery.
pub struct FanOut<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: Payload> Default for FanOut<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> FanOut<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Append a subscriber.
    pub fn add(&self, sink: Sink<T>) -> Subscription {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.insert(id, sink);
            id
        };
        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().entries.remove(&id);
            }
        })
    }

    /// Current subscribers in registration order.
    pub fn snapshot(&self) -> Vec<Sink<T>> {
        self.registry.lock().entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every subscriber in the pre-emission snapshot.
    pub fn fan_out(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        for sink in self.snapshot() {
            sink.deliver(value, ctx)?;
        }
        Ok(())
    }
}

/// Verdict of a node's inspection hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    /// Fan the value out.
    Accept,
    /// Fan the value out and mark it as the node's final emission.
    AcceptCompleting,
    /// Drop the value.
    Reject,
}

/// Hook run synchronously on every value before it is fanned out.
pub trait Inspect<T>: Send + Sync {
    fn inspect(&self, value: &T) -> Inspection;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T> Inspect<T> for PassThrough {
    fn inspect(&self, _value: &T) -> Inspection {
        Inspection::Accept
    }
}

/// A fan-out with an inspection hook in front of it.
pub struct Node<T, I = PassThrough> {
    name: &'static str,
    fan_out: FanOut<T>,
    inspector: I,
}

/// A root node that producers emit into.
pub type Channel<T> = Node<T, PassThrough>;

impl<T: Payload> Node<T, PassThrough> {
    pub fn new(name: &'static str) -> Self {
        Self::with_inspector(name, PassThrough)
    }
}

impl<T: Payload, I: Inspect<T>> Node<T, I> {
    pub fn with_inspector(name: &'static str, inspector: I) -> Self {
        Self {
            name,
            fan_out: FanOut::new(),
            inspector,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn inspector(&self) -> &I {
        &self.inspector
    }

    pub fn subscriber_count(&self) -> usize {
        self.fan_out.len()
    }

    /// Push `value` through this node within an ongoing emission.
    pub fn fire(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        match self.inspector.inspect(value) {
            Inspection::Accept => self.fan_out.fan_out(value, ctx),
            Inspection::AcceptCompleting => {
                ctx.completing(|ctx| self.fan_out.fan_out(value, ctx))
            }
            Inspection::Reject => {
                trace!(node = self.name, "Emission rejected");
                Ok(())
            }
        }
    }

    /// Start a top-level emission and await every handler it schedules.
    pub async fn emit(&self, value: T) -> EventResult<()> {
        let mut ctx = EmitContext::new();
        self.fire(&value, &mut ctx)?;
        trace!(node = self.name, deferred = ctx.pending(), "Draining emission");
        ctx.drain().await
    }
}

impl<T: Payload, I: Inspect<T>> Emittable<T> for Node<T, I> {
    fn register(&self, sink: Sink<T>) -> Subscription {
        self.fan_out.add(sink)
    }
}
