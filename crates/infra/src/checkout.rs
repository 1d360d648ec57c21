//! Purchase coordination: the single entry point that turns a
//! `PurchaseRequest` into a durable stock decrement and purchase record.
//!
//! The coordinator validates the request against policy before any store
//! access, then drives the command dispatcher in a bounded optimistic-retry
//! loop. A successful round commits exactly one `SweetPurchased` event,
//! which is simultaneously the stock mutation and the ledger entry, so there
//! is no partial state on any failure path. A round lost to a concurrent writer
//! surfaces as a concurrency error; the next round reloads the stream and
//! re-decides against fresh state. When the retry budget runs out the
//! caller gets `Contention` rather than an unbounded loop.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use sweetshop_catalog::{PurchaseSweet, SWEET_AGGREGATE_TYPE, Sweet, SweetCommand, SweetEvent, SweetId};
use sweetshop_checkout::{CheckoutPolicy, PurchaseError, PurchaseRecord, PurchaseRequest};
use sweetshop_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{CommittedEvent, EventStore};

/// Sole authority for executing purchases.
#[derive(Debug)]
pub struct PurchaseCoordinator<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    policy: CheckoutPolicy,
}

impl<S, B> PurchaseCoordinator<S, B> {
    pub fn new(dispatcher: CommandDispatcher<S, B>, policy: CheckoutPolicy) -> Self {
        Self { dispatcher, policy }
    }

    pub fn with_default_policy(dispatcher: CommandDispatcher<S, B>) -> Self {
        Self::new(dispatcher, CheckoutPolicy::default())
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }
}

impl<S, B> PurchaseCoordinator<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Execute a purchase: validate, conditionally decrement stock, and
    /// return the frozen purchase record.
    ///
    /// Exactly one committed event per success, zero on failure. The total
    /// price in the returned record was computed from the price the
    /// aggregate held inside the committed round, never from the caller
    /// and never from a stale read.
    pub fn execute_purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<PurchaseRecord, PurchaseError> {
        request.validate(&self.policy)?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let command = SweetCommand::PurchaseSweet(PurchaseSweet {
                sweet_id: request.sweet_id,
                purchaser_id: request.purchaser_id,
                quantity: request.quantity,
                occurred_at: Utc::now(),
            });

            match self.dispatcher.dispatch::<Sweet>(
                request.sweet_id.0,
                SWEET_AGGREGATE_TYPE,
                command,
                |id| Sweet::empty(SweetId::new(id)),
            ) {
                Ok(committed) => {
                    let record = record_from_committed(request.sweet_id, &committed)?;
                    info!(
                        sweet_id = %record.sweet_id,
                        purchaser_id = %record.purchaser_id,
                        quantity = record.quantity,
                        total_price = %record.total_price,
                        attempts,
                        "purchase committed"
                    );
                    return Ok(record);
                }
                Err(DispatchError::Concurrency(reason)) => {
                    if attempts >= self.policy.max_attempts {
                        warn!(
                            sweet_id = %request.sweet_id,
                            attempts,
                            reason = %reason,
                            "purchase abandoned after exhausting retry budget"
                        );
                        return Err(PurchaseError::Contention {
                            sweet_id: request.sweet_id,
                            attempts,
                        });
                    }
                    debug!(
                        sweet_id = %request.sweet_id,
                        attempt = attempts,
                        reason = %reason,
                        "purchase lost a concurrency race; retrying"
                    );
                }
                Err(other) => return Err(map_dispatch_error(&request, &self.policy, other)),
            }
        }
    }
}

/// Build the caller-facing record from the committed purchase event.
///
/// The record's identity is the committed event id and its timestamp is the
/// event's business time, so re-deriving it from the ledger would yield the
/// same value.
fn record_from_committed(
    sweet_id: SweetId,
    committed: &[CommittedEvent],
) -> Result<PurchaseRecord, PurchaseError> {
    let stored = committed
        .first()
        .ok_or_else(|| PurchaseError::Store("purchase committed no events".to_string()))?;

    let event: SweetEvent = serde_json::from_value(stored.payload.clone())
        .map_err(|e| PurchaseError::Store(format!("committed payload undecodable: {e}")))?;

    match event {
        SweetEvent::SweetPurchased(e) => Ok(PurchaseRecord {
            purchase_id: stored.event_id,
            sweet_id: e.sweet_id,
            purchaser_id: e.purchaser_id,
            name: e.name,
            category: e.category,
            quantity: e.quantity,
            unit_price: e.unit_price,
            total_price: e.total_price,
            purchased_at: e.occurred_at,
        }),
        other => Err(PurchaseError::Store(format!(
            "unexpected event committed for purchase of sweet {sweet_id}: {}",
            sweetshop_events::Event::event_type(&other)
        ))),
    }
}

fn map_dispatch_error(
    request: &PurchaseRequest,
    policy: &CheckoutPolicy,
    error: DispatchError,
) -> PurchaseError {
    match error {
        DispatchError::NotFound => PurchaseError::ItemNotFound {
            sweet_id: request.sweet_id,
        },
        DispatchError::InvalidQuantity { requested } => PurchaseError::InvalidQuantity {
            requested,
            max: policy.max_quantity_per_purchase,
        },
        DispatchError::InsufficientStock {
            requested,
            available,
        } => PurchaseError::InsufficientStock {
            sweet_id: request.sweet_id,
            requested,
            available,
        },
        // Concurrency is handled by the retry loop; anything else reaching
        // here is infrastructure.
        other => PurchaseError::Store(format!("{other:?}")),
    }
}
