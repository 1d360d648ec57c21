//! Checkout domain module.
//!
//! Pure purchase-side types: the request a buyer submits, the policy that
//! bounds it, the immutable record a completed purchase produces, and the
//! error taxonomy the coordinator reports. Orchestration lives in the infra
//! crate; nothing here performs IO.

pub mod purchase;

pub use purchase::{CheckoutPolicy, PurchaseError, PurchaseRecord, PurchaseRequest};
