//! Eventing layer: the event contract, stream envelopes, and the pub/sub
//! feed projections consume.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::EventBus;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus, Subscription};
