//! Per-emission bookkeeping.
//!
//! An [`EmitContext`] is created for every top-level emission and threaded by
//! mutable reference through the synchronous part of the emission tree.
//! Structural (unschedulable) sinks run inline while the tree is walked;
//! schedulable sinks are queued here and run in FIFO order by [`EmitContext::drain`]
//! once the walk has finished, so every combinator has settled its state
//! before any user handler observes a value.

use std::collections::VecDeque;
use std::fmt;

use futures::future::BoxFuture;
use tracing::warn;

use crate::error::EventResult;

/// A queued invocation of a schedulable sink, with its payload already bound.
pub(crate) type DeferredJob = Box<dyn FnOnce() -> BoxFuture<'static, EventResult<()>> + Send>;

/// State carried by one emission call tree.
pub struct EmitContext {
    completing: bool,
    deferred: VecDeque<DeferredJob>,
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitContext {
    /// Create a context for a new top-level emission.
    pub fn new() -> Self {
        Self {
            completing: false,
            deferred: VecDeque::new(),
        }
    }

    /// Whether the value being delivered is the last one its node will ever emit.
    pub fn is_completing(&self) -> bool {
        self.completing
    }

    /// Run `f` with the completing flag raised, restoring the previous flag after.
    ///
    /// The flag is scoped to the subtree below the node that raised it.
    pub(crate) fn completing<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.completing, true);
        let result = f(self);
        self.completing = previous;
        result
    }

    /// Queue a unit of work to run after the synchronous pass.
    pub fn defer<F>(&mut self, job: F)
    where
        F: FnOnce() -> BoxFuture<'static, EventResult<()>> + Send + 'static,
    {
        self.deferred.push_back(Box::new(job));
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Run every queued job in order.
    ///
    /// The first failing job stops the drain; the jobs behind it are dropped.
    pub async fn drain(mut self) -> EventResult<()> {
        while let Some(job) = self.deferred.pop_front() {
            if let Err(e) = job().await {
                let skipped = self.deferred.len();
                if skipped > 0 {
                    warn!(skipped, "Deferred handler failed, skipping remaining handlers");
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EmitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitContext")
            .field("completing", &self.completing)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
