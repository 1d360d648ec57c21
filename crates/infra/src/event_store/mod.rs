//! Append-only event stream storage.
//!
//! One trait, two backends: a HashMap store for tests and single-process
//! wiring, and Postgres for durability.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use r#trait::{CommittedEvent, EventStore, EventStoreError, PendingEvent};
