//! Revocable subscription handles.
//!
//! A [`Subscription`] owns nothing but the action that removes its sink from
//! a node. Disposal takes the action out of its slot before running it, so a
//! handle can be disposed any number of times (explicitly, or implicitly by a
//! combinator tearing down) and the removal logic runs at most once.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type DisposeAction = Box<dyn FnOnce() + Send>;

/// Handle returned by every registration.
///
/// Cloning yields another handle to the same registration. Dropping a handle
/// does not dispose it.
#[derive(Clone)]
pub struct Subscription {
    action: Arc<Mutex<Option<DisposeAction>>>,
}

impl Subscription {
    /// Wrap a removal action.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// A handle that is already disposed.
    pub fn empty() -> Self {
        Self {
            action: Arc::new(Mutex::new(None)),
        }
    }

    /// Revoke the registration. Subsequent calls are no-ops.
    pub fn dispose(&self) {
        // The slot lock is released before the action runs: removal may
        // re-enter other handles.
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[derive(Default)]
struct SerialState {
    current: Option<Subscription>,
    disposed: bool,
}

/// Holds at most one inner subscription at a time.
///
/// [`clear`](Self::clear) detaches the current inner subscription but leaves
/// the holder usable; [`dispose`](Self::dispose) detaches it permanently, and
/// anything [`set`](Self::set) afterwards is disposed immediately.
#[derive(Clone, Default)]
pub struct SerialSubscription {
    state: Arc<Mutex<SerialState>>,
}

impl SerialSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `next`, disposing whatever was installed before.
    pub fn set(&self, next: Subscription) {
        let outcome = {
            let mut state = self.state.lock();
            if state.disposed {
                Err(next)
            } else {
                Ok(state.current.replace(next))
            }
        };
        match outcome {
            Ok(Some(previous)) => previous.dispose(),
            Ok(None) => {}
            Err(rejected) => rejected.dispose(),
        }
    }

    /// Detach the current inner subscription without closing the holder.
    pub fn clear(&self) {
        let current = self.state.lock().current.take();
        if let Some(current) = current {
            current.dispose();
        }
    }

    /// Detach permanently.
    pub fn dispose(&self) {
        let current = {
            let mut state = self.state.lock();
            state.disposed = true;
            state.current.take()
        };
        if let Some(current) = current {
            current.dispose();
        }
    }

    /// Whether an inner subscription is installed.
    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .current
            .as_ref()
            .is_some_and(|s| !s.is_disposed())
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// A plain handle that permanently disposes this holder.
    pub fn to_subscription(&self) -> Subscription {
        let holder = self.clone();
        Subscription::new(move || holder.dispose())
    }
}

/// Disposes a group of subscriptions together.
#[derive(Clone, Default)]
pub struct CompositeSubscription {
    state: Arc<Mutex<(Vec<Subscription>, bool)>>,
}

impl CompositeSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Members added after disposal are disposed at once.
    pub fn add(&self, subscription: Subscription) {
        {
            let mut state = self.state.lock();
            if !state.1 {
                state.0.push(subscription);
                return;
            }
        }
        subscription.dispose();
    }

    pub fn len(&self) -> usize {
        self.state.lock().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispose(&self) {
        let members = {
            let mut state = self.state.lock();
            state.1 = true;
            std::mem::take(&mut state.0)
        };
        for member in members {
            member.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().1
    }
}
