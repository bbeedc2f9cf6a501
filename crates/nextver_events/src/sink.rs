//! Event sources and sinks.
//!
//! Every node in a combinator graph is an [`Emittable`]: something a [`Sink`]
//! can be registered against. Sinks come in two kinds and the distinction is
//! load-bearing:
//!
//! - [`Sink::Unschedulable`] runs inline while an emission walks the graph.
//!   Combinators use it between nodes so their bookkeeping observes the exact
//!   timing of each value. It must never suspend.
//! - [`Sink::Schedulable`] produces a future. Delivering to it only queues the
//!   future on the [`EmitContext`]; the future runs after the synchronous walk.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::EmitContext;
use crate::error::{EventError, EventResult};
use crate::subscription::Subscription;

/// Bound shared by every payload that flows through the engine.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Inline callback signature.
pub type TriggerFn<T> = dyn Fn(&T, &mut EmitContext) -> EventResult<()> + Send + Sync;

/// Deferred callback signature.
pub type ScheduleFn<T> = dyn Fn(T) -> BoxFuture<'static, EventResult<()>> + Send + Sync;

/// A registered handler.
pub enum Sink<T> {
    Unschedulable(Arc<TriggerFn<T>>),
    Schedulable(Arc<ScheduleFn<T>>),
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Unschedulable(f) => Self::Unschedulable(Arc::clone(f)),
            Self::Schedulable(f) => Self::Schedulable(Arc::clone(f)),
        }
    }
}

impl<T: Payload> Sink<T> {
    /// Sink that runs inline during the emission.
    pub fn unschedulable<F>(f: F) -> Self
    where
        F: Fn(&T, &mut EmitContext) -> EventResult<()> + Send + Sync + 'static,
    {
        Self::Unschedulable(Arc::new(f))
    }

    /// Sink whose work is queued and awaited after the emission's synchronous pass.
    pub fn schedulable<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EventResult<()>> + Send + 'static,
    {
        Self::Schedulable(Arc::new(move |value| f(value).boxed()))
    }

    pub fn is_schedulable(&self) -> bool {
        matches!(self, Self::Schedulable(_))
    }

    /// Run an unschedulable sink now.
    pub fn trigger(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        match self {
            Self::Unschedulable(f) => f(value, ctx),
            Self::Schedulable(_) => Err(EventError::irregular(
                "sink",
                "schedulable sink driven through the inline path",
            )),
        }
    }

    /// Queue a schedulable sink on the context.
    pub fn schedule(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        match self {
            Self::Schedulable(f) => {
                let f = Arc::clone(f);
                let value = value.clone();
                ctx.defer(move || f(value));
                Ok(())
            }
            Self::Unschedulable(_) => Err(EventError::irregular(
                "sink",
                "unschedulable sink driven through the scheduling path",
            )),
        }
    }

    /// Run inline or queue, whichever this sink's kind calls for.
    pub fn deliver(&self, value: &T, ctx: &mut EmitContext) -> EventResult<()> {
        match self {
            Self::Unschedulable(f) => f(value, ctx),
            Self::Schedulable(_) => self.schedule(value, ctx),
        }
    }
}

/// Anything a sink can be registered against.
pub trait Emittable<T>: Send + Sync {
    /// Register `sink`. The returned handle revokes the registration.
    fn register(&self, sink: Sink<T>) -> Subscription;
}

/// Shared, type-erased handle to a node.
pub type Source<T> = Arc<dyn Emittable<T>>;
