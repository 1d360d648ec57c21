//! Read-model projections over committed event envelopes.
//!
//! Projections are idempotent (cursor-checked per stream) so at-least-once
//! publication never double-applies, and disposable: every one can be
//! rebuilt from the event store.

pub mod catalog_view;
pub mod purchase_history;

pub use catalog_view::{CatalogFilter, CatalogProjection, CatalogProjectionError, SweetView};
pub use purchase_history::{PurchaseHistoryProjection, PurchaseHistoryProjectionError};
