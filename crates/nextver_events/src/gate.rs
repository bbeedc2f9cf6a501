//! Gate-rescope nodes.
//!
//! A gate-rescope node watches a *gate* source `G` and a *scoped* source `S`
//! and emits `(G, S)` pairs. Each gate value opens an epoch that lasts until
//! the next gate value; every scoped value seen during a live epoch is paired
//! with that epoch's gate value. The variants differ only in how a scoped
//! value that does not fall inside a live epoch is handled:
//!
//! - [`Replay::None`]: nothing is cached. Scoped values emitted before the
//!   first gate are not seen.
//! - [`Replay::First`]: the scoped source's first-ever value is also kept,
//!   whether it arrives before or after the first gate value. Every gate
//!   value is paired with that kept value when it opens its epoch; gate
//!   values that arrive before it are held and paired in order once it
//!   arrives.
//! - [`Replay::Symmetric`]: like `First`, but the kept value is the latest
//!   scoped value rather than the first one.
//!
//! The node holds at most one live subscription to the scoped source: the
//! old one is detached before a new one is created. A gate or scoped value
//! delivered with the completing flag set closes that side for good.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::context::EmitContext;
use crate::error::EventResult;
use crate::fanout::FanOut;
use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::{SerialSubscription, Subscription};

/// Replay strategy for scoped values that arrive out of step with the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replay {
    #[default]
    None,
    First,
    Symmetric,
}

struct GateState<G, S> {
    gate: Option<G>,
    cached: Option<S>,
    pending: VecDeque<G>,
    scoped_closed: bool,
}

/// Pairs every gate value with scoped values under a [`Replay`] strategy.
pub struct GateRescope<G, S> {
    replay: Replay,
    scoped: Source<S>,
    fan_out: FanOut<(G, S)>,
    state: Mutex<GateState<G, S>>,
    gate_subscription: SerialSubscription,
    scoped_subscription: SerialSubscription,
}

impl<G: Payload, S: Payload> GateRescope<G, S> {
    /// Attach to both sources.
    ///
    /// The node is hot: it tracks the gate (and, for the replaying variants,
    /// captures scoped values) from construction on, whether or not anything
    /// is subscribed downstream yet.
    pub fn new(gate: &Source<G>, scoped: Source<S>, replay: Replay) -> Arc<Self> {
        let node = Arc::new(Self {
            replay,
            scoped,
            fan_out: FanOut::new(),
            state: Mutex::new(GateState {
                gate: None,
                cached: None,
                pending: VecDeque::new(),
                scoped_closed: false,
            }),
            gate_subscription: SerialSubscription::new(),
            scoped_subscription: SerialSubscription::new(),
        });

        if replay != Replay::None {
            let this = Arc::clone(&node);
            let capture = node.scoped.register(Sink::unschedulable(move |value: &S, ctx| {
                this.on_capture(value, ctx)
            }));
            node.scoped_subscription.set(capture);
        }

        let this = Arc::clone(&node);
        let subscription = gate.register(Sink::unschedulable(move |value: &G, ctx| {
            this.on_gate(value, ctx)
        }));
        node.gate_subscription.set(subscription);
        node
    }

    pub fn replay(&self) -> Replay {
        self.replay
    }

    /// The cached scoped value, for the replaying variants.
    pub fn cached(&self) -> Option<S> {
        self.state.lock().cached.clone()
    }

    /// Gate values waiting for a first scoped value.
    pub fn pending_gates(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether a scoped subscription (capture or epoch) is live.
    pub fn is_scoped_attached(&self) -> bool {
        self.scoped_subscription.is_active()
    }

    pub fn is_gate_attached(&self) -> bool {
        self.gate_subscription.is_active()
    }

    pub fn subscriber_count(&self) -> usize {
        self.fan_out.len()
    }

    /// Detach from both sources.
    pub fn detach(&self) {
        self.gate_subscription.dispose();
        self.scoped_subscription.dispose();
    }

    fn on_gate(self: &Arc<Self>, gate: &G, ctx: &mut EmitContext) -> EventResult<()> {
        let gate_completing = ctx.is_completing();

        match self.replay {
            Replay::None => {
                self.scoped_subscription.clear();
                let closed = {
                    let mut state = self.state.lock();
                    state.gate = Some(gate.clone());
                    state.scoped_closed
                };
                if !closed {
                    self.open_epoch();
                }
            }
            Replay::First | Replay::Symmetric => {
                // The capture subscription only covers the time before the
                // first gate; from here on epochs take over.
                self.scoped_subscription.clear();
                let replayed = self.hold_or_pair(gate);
                let closed = self.state.lock().scoped_closed;
                if !closed {
                    self.open_epoch();
                }
                if let Some(scoped) = replayed {
                    self.fan_out.fan_out(&(gate.clone(), scoped), ctx)?;
                }
            }
        }

        if gate_completing {
            debug!("Gate completed, detaching gate");
            self.gate_subscription.dispose();
        }
        Ok(())
    }

    /// Record `gate` as the current epoch and return the cached scoped value
    /// to pair it with, or hold the gate until one exists.
    fn hold_or_pair(&self, gate: &G) -> Option<S> {
        let mut state = self.state.lock();
        state.gate = Some(gate.clone());
        if let Some(scoped) = state.cached.clone() {
            return Some(scoped);
        }
        state.pending.push_back(gate.clone());
        None
    }

    fn open_epoch(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let subscription = self.scoped.register(Sink::unschedulable(move |value: &S, ctx| {
            this.on_epoch_value(value, ctx)
        }));
        self.scoped_subscription.set(subscription);
    }

    fn on_capture(&self, value: &S, ctx: &mut EmitContext) -> EventResult<()> {
        let keep_listening = {
            let mut state = self.state.lock();
            if state.gate.is_some() {
                return Ok(());
            }
            match self.replay {
                Replay::First => {
                    if state.cached.is_none() {
                        state.cached = Some(value.clone());
                    }
                    false
                }
                _ => {
                    state.cached = Some(value.clone());
                    true
                }
            }
        };

        if ctx.is_completing() {
            self.close_scoped();
        } else if !keep_listening {
            self.scoped_subscription.clear();
        }
        Ok(())
    }

    fn on_epoch_value(&self, value: &S, ctx: &mut EmitContext) -> EventResult<()> {
        let pairs = {
            let mut state = self.state.lock();
            match self.replay {
                Replay::None => state.gate.iter().cloned().collect(),
                replay => {
                    let first_value = state.cached.is_none();
                    if first_value || replay == Replay::Symmetric {
                        state.cached = Some(value.clone());
                    }
                    // Held gates include the current one, so it is paired once.
                    if first_value && !state.pending.is_empty() {
                        state.pending.drain(..).collect::<Vec<_>>()
                    } else {
                        state.gate.iter().cloned().collect()
                    }
                }
            }
        };

        if ctx.is_completing() {
            self.close_scoped();
        }
        for gate in pairs {
            self.fan_out.fan_out(&(gate, value.clone()), ctx)?;
        }
        Ok(())
    }

    fn close_scoped(&self) {
        self.state.lock().scoped_closed = true;
        self.scoped_subscription.clear();
    }
}

impl<G: Payload, S: Payload> Emittable<(G, S)> for GateRescope<G, S> {
    fn register(&self, sink: Sink<(G, S)>) -> Subscription {
        self.fan_out.add(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::Cached;
    use crate::fanout::Channel;

    type Pairs = Arc<Mutex<Vec<(&'static str, i32)>>>;

    struct Wiring {
        gate: Arc<Channel<&'static str>>,
        scoped: Arc<Channel<i32>>,
        node: Arc<GateRescope<&'static str, i32>>,
        pairs: Pairs,
    }

    fn wire(replay: Replay) -> Wiring {
        let gate = Arc::new(Channel::<&'static str>::new("gate"));
        let scoped = Arc::new(Channel::<i32>::new("scoped"));
        let gate_source: Source<&'static str> = gate.clone();
        let node = GateRescope::new(&gate_source, scoped.clone(), replay);

        let pairs: Pairs = Arc::default();
        let log = Arc::clone(&pairs);
        node.register(Sink::unschedulable(move |pair: &(&'static str, i32), _ctx| {
            log.lock().push(*pair);
            Ok(())
        }));
        Wiring {
            gate,
            scoped,
            node,
            pairs,
        }
    }

    #[tokio::test]
    async fn test_no_replay_scopes_to_epoch() {
        let w = wire(Replay::None);

        w.scoped.emit(0).await.unwrap();
        assert_eq!(w.scoped.subscriber_count(), 0);

        w.gate.emit("g1").await.unwrap();
        w.scoped.emit(1).await.unwrap();
        w.scoped.emit(2).await.unwrap();
        w.gate.emit("g2").await.unwrap();
        w.scoped.emit(3).await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 1), ("g1", 2), ("g2", 3)]);
        assert_eq!(w.scoped.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_first_scoped_before_gate() {
        let w = wire(Replay::First);

        w.scoped.emit(0).await.unwrap();
        assert!(!w.node.is_scoped_attached());

        w.gate.emit("g1").await.unwrap();
        w.gate.emit("g2").await.unwrap();
        w.scoped.emit(5).await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 0), ("g2", 0), ("g2", 5)]);
        assert_eq!(w.node.cached(), Some(0));
    }

    #[tokio::test]
    async fn test_replay_first_keeps_epoch_values() {
        let w = wire(Replay::First);

        w.gate.emit("g1").await.unwrap();
        w.scoped.emit(1).await.unwrap();
        w.scoped.emit(2).await.unwrap();
        w.gate.emit("g2").await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 1), ("g1", 2), ("g2", 1)]);
        assert_eq!(w.node.cached(), Some(1));
        assert_eq!(w.scoped.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_first_holds_gates_until_scoped() {
        let w = wire(Replay::First);

        w.gate.emit("g1").await.unwrap();
        w.gate.emit("g2").await.unwrap();
        assert_eq!(w.node.pending_gates(), 2);
        assert!(w.pairs.lock().is_empty());

        w.scoped.emit(7).await.unwrap();
        w.gate.emit("g3").await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 7), ("g2", 7), ("g3", 7)]);
        assert_eq!(w.node.pending_gates(), 0);
        assert_eq!(w.scoped.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_symmetric_pairs_either_order() {
        let w = wire(Replay::Symmetric);

        w.scoped.emit(0).await.unwrap();
        w.gate.emit("g1").await.unwrap();
        w.scoped.emit(1).await.unwrap();
        w.gate.emit("g2").await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 0), ("g1", 1), ("g2", 1)]);
        assert_eq!(w.scoped.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_symmetric_holds_gates_without_duplicates() {
        let w = wire(Replay::Symmetric);

        w.gate.emit("g1").await.unwrap();
        w.gate.emit("g2").await.unwrap();
        w.scoped.emit(4).await.unwrap();
        w.scoped.emit(5).await.unwrap();

        assert_eq!(*w.pairs.lock(), vec![("g1", 4), ("g2", 4), ("g2", 5)]);
        assert_eq!(w.scoped.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_single_scoped_subscription_across_epochs() {
        let w = wire(Replay::None);
        for gate in ["g1", "g2", "g3", "g4"] {
            w.gate.emit(gate).await.unwrap();
            assert_eq!(w.scoped.subscriber_count(), 1);
        }
        w.scoped.emit(9).await.unwrap();
        assert_eq!(*w.pairs.lock(), vec![("g4", 9)]);
    }

    #[tokio::test]
    async fn test_completing_gate_detaches() {
        let gate = Arc::new(Channel::<&'static str>::new("gate"));
        let scoped = Arc::new(Channel::<i32>::new("scoped"));
        let gate_source: Source<&'static str> = gate.clone();
        let first_gate: Source<&'static str> = Cached::first(&gate_source);
        let node = GateRescope::new(&first_gate, scoped.clone(), Replay::None);

        gate.emit("g1").await.unwrap();
        assert!(!node.is_gate_attached());
        assert!(node.is_scoped_attached());
    }

    #[tokio::test]
    async fn test_completing_scoped_closes_epochs() {
        let gate = Arc::new(Channel::<&'static str>::new("gate"));
        let scoped = Arc::new(Channel::<i32>::new("scoped"));
        let gate_source: Source<&'static str> = gate.clone();
        let scoped_source: Source<i32> = scoped.clone();
        let first_scoped: Source<i32> = Cached::first(&scoped_source);
        let node = GateRescope::new(&gate_source, first_scoped, Replay::None);

        let pairs: Pairs = Arc::default();
        let log = Arc::clone(&pairs);
        node.register(Sink::unschedulable(move |pair: &(&'static str, i32), _ctx| {
            log.lock().push(*pair);
            Ok(())
        }));

        gate.emit("g1").await.unwrap();
        scoped.emit(1).await.unwrap();
        assert!(!node.is_scoped_attached());

        gate.emit("g2").await.unwrap();
        assert!(!node.is_scoped_attached());
        assert_eq!(*pairs.lock(), vec![("g1", 1)]);
    }
}
