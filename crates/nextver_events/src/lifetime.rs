//! Self-cancelling registrations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sink::{Emittable, Payload, Sink, Source};
use crate::subscription::{SerialSubscription, Subscription};

/// Delivers exactly one value to each registration, then revokes it.
///
/// Every registration gets its own upstream subscription, so two sinks
/// registered at different times each receive the first value that arrives
/// after *they* registered.
pub struct Once<T> {
    source: Source<T>,
}

impl<T: Payload> Once<T> {
    pub fn new(source: Source<T>) -> Self {
        Self { source }
    }
}

impl<T: Payload> Emittable<T> for Once<T> {
    fn register(&self, sink: Sink<T>) -> Subscription {
        let fired = Arc::new(AtomicBool::new(false));
        let upstream = SerialSubscription::new();

        let slot = upstream.clone();
        let subscription = self.source.register(Sink::unschedulable(move |value: &T, ctx| {
            // A nested emission of the same source can reach this sink again
            // before the upstream removal takes effect.
            if fired.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            slot.dispose();
            sink.deliver(value, ctx)
        }));
        upstream.set(subscription);
        upstream.to_subscription()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::Channel;
    use parking_lot::Mutex;

    fn collect(log: &Arc<Mutex<Vec<i32>>>) -> Sink<i32> {
        let log = Arc::clone(log);
        Sink::unschedulable(move |v: &i32, _ctx| {
            log.lock().push(*v);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_once_delivers_one_value() {
        let channel = Arc::new(Channel::<i32>::new("numbers"));
        let once = Once::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        once.register(collect(&log));

        for v in [1, 2, 3] {
            channel.emit(v).await.unwrap();
        }

        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_once_is_per_registration() {
        let channel = Arc::new(Channel::<i32>::new("numbers"));
        let once = Once::new(channel.clone());
        let early = Arc::new(Mutex::new(Vec::new()));
        let late = Arc::new(Mutex::new(Vec::new()));

        once.register(collect(&early));
        channel.emit(1).await.unwrap();
        once.register(collect(&late));
        channel.emit(2).await.unwrap();
        channel.emit(3).await.unwrap();

        assert_eq!(*early.lock(), vec![1]);
        assert_eq!(*late.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_disposed_before_firing() {
        let channel = Arc::new(Channel::<i32>::new("numbers"));
        let once = Once::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        let subscription = once.register(collect(&log));
        subscription.dispose();
        channel.emit(1).await.unwrap();

        assert!(log.lock().is_empty());
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_reentrant_emission_delivers_once() {
        let channel = Arc::new(Channel::<i32>::new("numbers"));
        let once = Once::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        // An inline sink ahead of the Once registration re-fires the channel.
        let refire = Arc::clone(&channel);
        channel.register(Sink::unschedulable(move |v: &i32, ctx| {
            if *v == 1 {
                refire.fire(&2, ctx)?;
            }
            Ok(())
        }));
        once.register(collect(&log));

        channel.emit(1).await.unwrap();
        assert_eq!(*log.lock(), vec![2]);
    }
}
