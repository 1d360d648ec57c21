//! Channel-backed bus for tests and single-process wiring.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use crate::bus::EventBus;

/// Receiving half handed to a consumer.
///
/// One channel per subscriber, broadcast semantics: every subscriber gets a
/// clone of each message published after it subscribed. Meant to be drained
/// by a dedicated consumer thread looping on `recv`.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: mpsc::Receiver<M>,
}

impl<M> Subscription<M> {
    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Receive without blocking.
    pub fn try_recv(&self) -> Result<M, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Failure publishing through the in-memory bus.
#[derive(Debug)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned by a panicking thread.
    Poisoned,
}

/// In-memory pub/sub bus with broadcast semantics.
///
/// Holds no history: a late subscriber sees only what is published after it
/// subscribed, and anything missed is replayable from the event store.
/// Subscribers whose receiving end has hung up are forgotten on the next
/// publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and hand back its receiving end.
    pub fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock leaves the subscription connected to nothing; it
        // simply never receives messages.
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }

        Subscription { receiver: rx }
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        let mut i = 0;
        while i < senders.len() {
            if senders[i].send(message.clone()).is_ok() {
                i += 1;
            } else {
                // Receiver hung up; forget the dead subscriber.
                senders.swap_remove(i);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_to_every_subscriber() {
        let bus = InMemoryEventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7u32).unwrap();

        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn dropped_subscriber_does_not_break_the_others() {
        let bus = InMemoryEventBus::new();
        let dead = bus.subscribe();
        let live = bus.subscribe();
        drop(dead);

        bus.publish("first".to_string()).unwrap();
        bus.publish("second".to_string()).unwrap();

        assert_eq!(live.try_recv().unwrap(), "first");
        assert_eq!(live.try_recv().unwrap(), "second");
    }

    #[test]
    fn late_subscriber_sees_only_later_messages() {
        let bus = InMemoryEventBus::new();
        bus.publish(1u8).unwrap();

        let sub = bus.subscribe();
        bus.publish(2u8).unwrap();

        assert_eq!(sub.try_recv().unwrap(), 2);
        assert!(sub.try_recv().is_err());
    }
}
