use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use sweetshop_catalog::SweetId;
use sweetshop_core::{Entity, Money, PurchaserId};

/// Bounds applied to every purchase attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Largest quantity a single purchase may request (anti-hoarding cap).
    pub max_quantity_per_purchase: i64,
    /// How many optimistic-concurrency rounds the coordinator runs before
    /// reporting `Contention`.
    pub max_attempts: u32,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            max_quantity_per_purchase: 10,
            max_attempts: 5,
        }
    }
}

/// A buyer's intent to purchase N units of one sweet.
///
/// The purchaser identity arrives pre-authenticated from the identity
/// service; no pricing information is accepted from the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub sweet_id: SweetId,
    pub purchaser_id: PurchaserId,
    pub quantity: i64,
}

impl PurchaseRequest {
    /// Validate the request against policy, before any store access.
    pub fn validate(&self, policy: &CheckoutPolicy) -> Result<(), PurchaseError> {
        if self.quantity < 1 || self.quantity > policy.max_quantity_per_purchase {
            return Err(PurchaseError::InvalidQuantity {
                requested: self.quantity,
                max: policy.max_quantity_per_purchase,
            });
        }
        Ok(())
    }
}

/// Immutable record of a completed purchase.
///
/// Created exactly once per successful coordinator call; never mutated or
/// deleted. `unit_price`/`total_price` and the name/category snapshot were
/// frozen inside the purchase's atomic step, so later repricing, renaming,
/// or archiving of the sweet cannot change this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub purchase_id: Uuid,
    /// Weak reference: the sweet may be archived later.
    pub sweet_id: SweetId,
    pub purchaser_id: PurchaserId,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub purchased_at: DateTime<Utc>,
}

impl Entity for PurchaseRecord {
    type Id = Uuid;

    fn id(&self) -> &Self::Id {
        &self.purchase_id
    }
}

/// Why a purchase attempt did not produce a record.
///
/// All variants are recoverable outcomes for the presentation layer, each
/// carrying enough detail for a user-facing message. `Store` is the one
/// infrastructure leg (storage/serialization faults) and is kept separate
/// from the four domain outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// The sweet id did not resolve (unknown or archived).
    #[error("sweet {sweet_id} not found")]
    ItemNotFound { sweet_id: SweetId },

    /// Requested quantity is out of the allowed 1..=max range.
    #[error("invalid quantity {requested} (allowed 1..={max})")]
    InvalidQuantity { requested: i64, max: i64 },

    /// Stock cannot cover the request; nothing was fulfilled.
    #[error("insufficient stock for sweet {sweet_id}: requested {requested}, available {available}")]
    InsufficientStock {
        sweet_id: SweetId,
        requested: i64,
        available: i64,
    },

    /// The conditional update lost every round of its retry budget.
    #[error("purchase of sweet {sweet_id} contended for {attempts} attempts; giving up")]
    Contention { sweet_id: SweetId, attempts: u32 },

    /// Storage or serialization failure underneath the coordinator.
    #[error("store failure: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweetshop_core::AggregateId;

    fn request(quantity: i64) -> PurchaseRequest {
        PurchaseRequest {
            sweet_id: SweetId::new(AggregateId::new()),
            purchaser_id: PurchaserId::new(),
            quantity,
        }
    }

    #[test]
    fn default_policy_caps_at_ten_and_five_attempts() {
        let policy = CheckoutPolicy::default();
        assert_eq!(policy.max_quantity_per_purchase, 10);
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn validate_accepts_in_range_quantities() {
        let policy = CheckoutPolicy::default();
        assert!(request(1).validate(&policy).is_ok());
        assert!(request(10).validate(&policy).is_ok());
    }

    #[test]
    fn validate_rejects_zero_negative_and_over_cap() {
        let policy = CheckoutPolicy::default();
        for bad in [0, -1, 11] {
            let err = request(bad).validate(&policy).unwrap_err();
            assert_eq!(
                err,
                PurchaseError::InvalidQuantity {
                    requested: bad,
                    max: 10
                }
            );
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Validation accepts exactly the 1..=cap range, nothing else.
            #[test]
            fn validate_accepts_exactly_the_policy_range(quantity in -50i64..50) {
                let policy = CheckoutPolicy::default();
                let result = request(quantity).validate(&policy);
                if (1..=policy.max_quantity_per_purchase).contains(&quantity) {
                    prop_assert!(result.is_ok());
                } else {
                    prop_assert_eq!(
                        result.unwrap_err(),
                        PurchaseError::InvalidQuantity {
                            requested: quantity,
                            max: policy.max_quantity_per_purchase,
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn record_identity_is_the_purchase_id() {
        let record = PurchaseRecord {
            purchase_id: Uuid::now_v7(),
            sweet_id: SweetId::new(AggregateId::new()),
            purchaser_id: PurchaserId::new(),
            name: "Caramel Chew".to_string(),
            category: "Toffee".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(125),
            total_price: Money::from_cents(250),
            purchased_at: Utc::now(),
        };
        assert_eq!(*record.id(), record.purchase_id);
    }
}
