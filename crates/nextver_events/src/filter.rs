//! Predicate and projection nodes.
//!
//! Both register per downstream sink: each registration gets its own inline
//! upstream sink, and revoking the registration revokes that upstream sink.

use std::sync::Arc;

use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::Subscription;

type Predicate<T, S> = dyn Fn(&T, &S) -> bool + Send + Sync;
type Projection<T, U> = dyn Fn(&T) -> U + Send + Sync;

/// Forwards values for which the predicate holds, drops the rest.
pub struct Where<T, S = ()> {
    source: Source<T>,
    state: Arc<S>,
    predicate: Arc<Predicate<T, S>>,
}

impl<T: Payload> Where<T, ()> {
    pub fn new<P>(source: Source<T>, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::with_state(source, (), move |value, _| predicate(value))
    }
}

impl<T: Payload, S: Send + Sync + 'static> Where<T, S> {
    /// Evaluate `predicate` against each value and a fixed piece of state.
    pub fn with_state<P>(source: Source<T>, state: S, predicate: P) -> Self
    where
        P: Fn(&T, &S) -> bool + Send + Sync + 'static,
    {
        Self {
            source,
            state: Arc::new(state),
            predicate: Arc::new(predicate),
        }
    }
}

impl<T: Payload, S: Send + Sync + 'static> Emittable<T> for Where<T, S> {
    fn register(&self, sink: Sink<T>) -> Subscription {
        let state = Arc::clone(&self.state);
        let predicate = Arc::clone(&self.predicate);
        self.source.register(Sink::unschedulable(move |value: &T, ctx| {
            if predicate(value, &state) {
                sink.deliver(value, ctx)
            } else {
                Ok(())
            }
        }))
    }
}

/// Forwards the projection of every value.
pub struct Transform<T, U> {
    source: Source<T>,
    projection: Arc<Projection<T, U>>,
}

impl<T: Payload, U: Payload> Transform<T, U> {
    pub fn new<F>(source: Source<T>, projection: F) -> Self
    where
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Self {
            source,
            projection: Arc::new(projection),
        }
    }
}

impl<T: Payload, U: Payload> Emittable<U> for Transform<T, U> {
    fn register(&self, sink: Sink<U>) -> Subscription {
        let projection = Arc::clone(&self.projection);
        self.source.register(Sink::unschedulable(move |value: &T, ctx| {
            let projected = projection(value);
            sink.deliver(&projected, ctx)
        }))
    }
}
