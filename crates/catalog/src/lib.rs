//! Catalog domain module (event-sourced).
//!
//! This crate contains the business rules for the sweet catalog (stock,
//! pricing, and the purchase decision), implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod sweet;

pub use sweet::{
    ArchiveSweet, CreateSweet, PurchaseSweet, RestockSweet, SWEET_AGGREGATE_TYPE, Sweet,
    SweetArchived, SweetCommand, SweetCreated, SweetDetailsUpdated, SweetEvent, SweetId,
    SweetPurchased, SweetRestocked, UpdateSweetDetails,
};
