//! Operator facade.
//!
//! Combinator constructors take a [`Source`] and return a new [`Source`], so
//! graphs are built by plain function composition:
//!
//! ```rust
//! use std::sync::Arc;
//! use nextver_events::{ops, Channel, Source};
//!
//! let numbers = Arc::new(Channel::<i32>::new("numbers"));
//! let labels = Arc::new(Channel::<&'static str>::new("labels"));
//! let numbers: Source<i32> = numbers;
//! let labels: Source<&'static str> = labels;
//!
//! let evens = ops::filter(&numbers, |n| n % 2 == 0);
//! let labelled = ops::zip(&evens, &labels);
//! let _subscription = ops::on(&labelled, |(n, label)| {
//!     println!("{label}: {n}");
//!     Ok(())
//! });
//! ```
//!
//! Registration helpers wrap user handlers in schedulable sinks, so a handler
//! always runs after every combinator touched by the same emission has
//! settled.

use std::future::Future;
use std::sync::Arc;

use crate::caching::Cached;
use crate::error::EventResult;
use crate::filter::{Transform, Where};
use crate::gate::{GateRescope, Replay};
use crate::lifetime::Once;
use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::Subscription;
use crate::zip::Zip;

// ---- Combinators ----

/// Remembers the most recent value.
pub fn latest<T: Payload>(source: &Source<T>) -> Source<T> {
    Cached::latest(source)
}

/// Remembers the first value, still forwards every value.
pub fn earliest<T: Payload>(source: &Source<T>) -> Source<T> {
    Cached::earliest(source)
}

/// Forwards the first value only, marked as completing.
pub fn first<T: Payload>(source: &Source<T>) -> Source<T> {
    Cached::first(source)
}

/// Each registration receives exactly one value.
pub fn once<T: Payload>(source: &Source<T>) -> Source<T> {
    Arc::new(Once::new(Arc::clone(source)))
}

/// Alias of [`once`].
pub fn one_time<T: Payload>(source: &Source<T>) -> Source<T> {
    once(source)
}

#[doc(alias = "where")]
pub fn filter<T, P>(source: &Source<T>, predicate: P) -> Source<T>
where
    T: Payload,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(Where::new(Arc::clone(source), predicate))
}

/// [`filter`] with a fixed piece of predicate state.
pub fn filter_with<T, S, P>(source: &Source<T>, state: S, predicate: P) -> Source<T>
where
    T: Payload,
    S: Send + Sync + 'static,
    P: Fn(&T, &S) -> bool + Send + Sync + 'static,
{
    Arc::new(Where::with_state(Arc::clone(source), state, predicate))
}

#[doc(alias = "map")]
pub fn transform<T, U, F>(source: &Source<T>, projection: F) -> Source<U>
where
    T: Payload,
    U: Payload,
    F: Fn(&T) -> U + Send + Sync + 'static,
{
    Arc::new(Transform::new(Arc::clone(source), projection))
}

/// Pairs values from both sides in arrival order.
pub fn zip<A: Payload, B: Payload>(left: &Source<A>, right: &Source<B>) -> Source<(A, B)> {
    Zip::new(Arc::clone(left), Arc::clone(right))
}

/// Alias of [`zip`].
pub fn and<A: Payload, B: Payload>(left: &Source<A>, right: &Source<B>) -> Source<(A, B)> {
    zip(left, right)
}

pub fn gate_rescope<G: Payload, S: Payload>(
    gate: &Source<G>,
    scoped: &Source<S>,
    replay: Replay,
) -> Source<(G, S)> {
    GateRescope::new(gate, Arc::clone(scoped), replay)
}

pub fn once_every<G: Payload, S: Payload>(gate: &Source<G>, scoped: &Source<S>) -> Source<(G, S)> {
    gate_rescope(gate, scoped, Replay::None)
}

/// Reads as "after each gate, the next step".
pub fn once_every_then<G: Payload, S: Payload>(gate: &Source<G>, scoped: &Source<S>) -> Source<(G, S)> {
    gate_rescope(gate, scoped, Replay::None)
}

/// Reads as "after each gate, every subsequent step".
pub fn once_every_then_every<G: Payload, S: Payload>(
    gate: &Source<G>,
    scoped: &Source<S>,
) -> Source<(G, S)> {
    gate_rescope(gate, scoped, Replay::None)
}

pub fn once_every_replay_first<G: Payload, S: Payload>(
    gate: &Source<G>,
    scoped: &Source<S>,
) -> Source<(G, S)> {
    gate_rescope(gate, scoped, Replay::First)
}

pub fn once_first<G: Payload, S: Payload>(gate: &Source<G>, scoped: &Source<S>) -> Source<(G, S)> {
    gate_rescope(gate, scoped, Replay::First)
}

/// `x` repeats, `y` is the (usually one-time) value paired with each `x`.
pub fn once_every_x_replay_one_time_xy<X: Payload, Y: Payload>(
    x: &Source<X>,
    y: &Source<Y>,
) -> Source<(X, Y)> {
    gate_rescope(x, y, Replay::Symmetric)
}

// ---- Registration ----

/// Run `handler` for every value.
pub fn on<T, F>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn(T) -> EventResult<()> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    source.register(Sink::schedulable(move |value: T| {
        let handler = Arc::clone(&handler);
        async move { handler(value) }
    }))
}

/// Run a suspending `handler` for every value.
pub fn on_async<T, F, Fut>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EventResult<()>> + Send + 'static,
{
    source.register(Sink::schedulable(handler))
}

/// Run `handler` for every value, alongside a piece of shared state.
pub fn on_with<T, S, F>(source: &Source<T>, state: S, handler: F) -> Subscription
where
    T: Payload,
    S: Send + Sync + 'static,
    F: Fn(T, &S) -> EventResult<()> + Send + Sync + 'static,
{
    let state = Arc::new(state);
    on(source, move |value| handler(value, &state))
}

/// Run `handler` whenever the source emits, ignoring the value.
pub fn on_signal<T, F>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn() -> EventResult<()> + Send + Sync + 'static,
{
    on(source, move |_| handler())
}

/// [`on`], for the next value only.
pub fn on_once<T, F>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn(T) -> EventResult<()> + Send + Sync + 'static,
{
    on(&once(source), handler)
}

/// [`on_async`], for the next value only.
pub fn on_once_async<T, F, Fut>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EventResult<()>> + Send + 'static,
{
    on_async(&once(source), handler)
}

/// [`on_with`], for the next value only.
pub fn on_once_with<T, S, F>(source: &Source<T>, state: S, handler: F) -> Subscription
where
    T: Payload,
    S: Send + Sync + 'static,
    F: Fn(T, &S) -> EventResult<()> + Send + Sync + 'static,
{
    on_with(&once(source), state, handler)
}

/// [`on_signal`], for the next value only.
pub fn on_once_signal<T, F>(source: &Source<T>, handler: F) -> Subscription
where
    T: Payload,
    F: Fn() -> EventResult<()> + Send + Sync + 'static,
{
    on_signal(&once(source), handler)
}
