//! Pairwise synchronisation of two independently timed sources.
//!
//! Values from each side wait in a FIFO queue until the other side produces a
//! counterpart; pairs are emitted in arrival order. A value is paired as soon
//! as a counterpart exists, so at most one of the two queues holds anything
//! at a time.
//!
//! The node connects to both sides when its first subscriber registers and
//! disconnects when its last subscriber leaves. Queues are allocated on
//! connect and released on disconnect when both are empty; unpaired values
//! left over at disconnect are kept for the next subscriber.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::context::EmitContext;
use crate::error::{EventError, EventResult};
use crate::fanout::FanOut;
use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::{CompositeSubscription, Subscription};

struct PairingQueues<A, B> {
    left: VecDeque<A>,
    right: VecDeque<B>,
}

impl<A, B> PairingQueues<A, B> {
    fn new() -> Self {
        Self {
            left: VecDeque::new(),
            right: VecDeque::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

struct ZipState<A, B> {
    queues: Option<PairingQueues<A, B>>,
    upstream: Option<CompositeSubscription>,
}

/// Emits `(A, B)` pairs in arrival order.
pub struct Zip<A, B> {
    left: Source<A>,
    right: Source<B>,
    fan_out: FanOut<(A, B)>,
    state: Mutex<ZipState<A, B>>,
    this: Weak<Self>,
}

/// Same node, named for call sites that read as "this and that".
pub type And<A, B> = Zip<A, B>;

impl<A: Payload, B: Payload> Zip<A, B> {
    pub fn new(left: Source<A>, right: Source<B>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            left,
            right,
            fan_out: FanOut::new(),
            state: Mutex::new(ZipState {
                queues: None,
                upstream: None,
            }),
            this: this.clone(),
        })
    }

    /// Queue lengths `(left, right)`, or `None` while the queues are released.
    pub fn queue_lengths(&self) -> Option<(usize, usize)> {
        self.state
            .lock()
            .queues
            .as_ref()
            .map(|q| (q.left.len(), q.right.len()))
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().upstream.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.fan_out.len()
    }

    fn connect(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let upstream = {
            let mut state = self.state.lock();
            if state.upstream.is_some() {
                return;
            }
            if state.queues.is_none() {
                state.queues = Some(PairingQueues::new());
            }
            let upstream = CompositeSubscription::new();
            state.upstream = Some(upstream.clone());
            upstream
        };
        debug!("Zip connecting upstream");

        let left = Arc::clone(&this);
        upstream.add(self.left.register(Sink::unschedulable(move |value: &A, ctx| {
            left.on_left(value, ctx)
        })));
        let right = this;
        upstream.add(self.right.register(Sink::unschedulable(move |value: &B, ctx| {
            right.on_right(value, ctx)
        })));
    }

    fn release(&self) {
        let upstream = {
            let mut state = self.state.lock();
            if !self.fan_out.is_empty() {
                return;
            }
            if state.queues.as_ref().is_some_and(PairingQueues::is_empty) {
                state.queues = None;
            }
            state.upstream.take()
        };
        if let Some(upstream) = upstream {
            debug!("Zip disconnecting upstream");
            upstream.dispose();
        }
    }

    fn on_left(&self, value: &A, ctx: &mut EmitContext) -> EventResult<()> {
        let pair = {
            let mut state = self.state.lock();
            let queues = state
                .queues
                .as_mut()
                .ok_or_else(|| EventError::irregular("zip", "left value received without queues"))?;
            match queues.right.pop_front() {
                Some(right) => Some((value.clone(), right)),
                None => {
                    queues.left.push_back(value.clone());
                    None
                }
            }
        };
        match pair {
            Some(pair) => self.fan_out.fan_out(&pair, ctx),
            None => Ok(()),
        }
    }

    fn on_right(&self, value: &B, ctx: &mut EmitContext) -> EventResult<()> {
        let pair = {
            let mut state = self.state.lock();
            let queues = state
                .queues
                .as_mut()
                .ok_or_else(|| EventError::irregular("zip", "right value received without queues"))?;
            match queues.left.pop_front() {
                Some(left) => Some((left, value.clone())),
                None => {
                    queues.right.push_back(value.clone());
                    None
                }
            }
        };
        match pair {
            Some(pair) => self.fan_out.fan_out(&pair, ctx),
            None => Ok(()),
        }
    }
}

impl<A: Payload, B: Payload> Emittable<(A, B)> for Zip<A, B> {
    fn register(&self, sink: Sink<(A, B)>) -> Subscription {
        let entry = self.fan_out.add(sink);
        self.connect();
        let this = self.this.clone();
        Subscription::new(move || {
            entry.dispose();
            if let Some(zip) = this.upgrade() {
                zip.release();
            }
        })
    }
}
