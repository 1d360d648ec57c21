//! Shared error model for the domain layer.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic domain failures.
///
/// Everything here is a business outcome, not an infrastructure fault, and
/// every variant is recoverable by the caller. The two stock variants carry
/// their numbers as fields: the storefront tells a buyer "requested 3, only
/// 2 left", so the figures must cross layer boundaries without being parsed
/// back out of a message string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation before any decision was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command would break a domain invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier would not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The target does not exist, or is no longer live.
    #[error("not found")]
    NotFound,

    /// The command raced another writer and lost (stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested units were zero, negative, or otherwise nonsensical.
    #[error("invalid quantity: {requested}")]
    InvalidQuantity { requested: i64 },

    /// Stock on hand does not cover the request.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_quantity(requested: i64) -> Self {
        Self::InvalidQuantity { requested }
    }

    pub fn insufficient_stock(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }
}
