//! Event distribution boundary.
//!
//! Publication happens strictly after the append commits: the store is the
//! source of truth and the bus is a best-effort feed on top of it. Delivery
//! is at-least-once with no cross-publisher ordering, so consumers keep
//! their own cursors and treat redelivery as a no-op; anything missed can
//! be replayed from the store.

use std::sync::Arc;

/// Transport-agnostic publisher side of the pub/sub pair.
///
/// A publish failure is surfaced to the caller rather than swallowed: the
/// committed events are already durable, so the caller decides whether to
/// republish or let a projection rebuild pick them up.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }
}
