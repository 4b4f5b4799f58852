//! Event subscriptions
//!
//! A small fan-out publisher: every subscriber owns an unbounded channel and
//! drains it whenever it likes. Publishing never blocks, and subscribers that
//! dropped their end are pruned on the next publish.

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};

/// Fan-out event publisher
#[derive(Debug)]
pub struct EventBus<E> {
    subscribers: Vec<Sender<E>>,
}

/// Receiving end of one subscription
#[derive(Debug)]
pub struct Subscription<E> {
    rx: Receiver<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Subscription<E> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Deliver an event to every live subscriber
    pub fn publish(&mut self, event: E) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Number of subscribers still connected as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Subscription<E> {
    /// Next queued event, if any
    pub fn try_recv(&self) -> Option<E> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All queued events, oldest first
    pub fn drain(&self) -> Vec<E> {
        self.rx.try_iter().collect()
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(1u32);
        bus.publish(2u32);

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.try_recv(), Some(1));
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        let gone = bus.subscribe();
        drop(gone);

        bus.publish("tracking-limited".to_string());
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.drain(), vec!["tracking-limited".to_string()]);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(5i32);
        let late = bus.subscribe();
        assert!(late.try_recv().is_none());
    }
}
