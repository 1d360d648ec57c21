//! Disposable read-model storage.

pub mod store;

pub use store::{InMemoryKeyValueStore, KeyValueStore};
