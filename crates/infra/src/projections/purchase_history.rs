use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use sweetshop_catalog::{SweetEvent, SweetId};
use sweetshop_checkout::PurchaseRecord;
use sweetshop_core::{AggregateId, Money, PurchaserId};
use sweetshop_events::EventEnvelope;

use crate::read_model::KeyValueStore;

#[derive(Debug, Error)]
pub enum PurchaseHistoryProjectionError {
    #[error("failed to deserialize sweet event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic revision (last={last}, found={found})")]
    NonMonotonicRevision { last: u64, found: u64 },
}

/// Purchase ledger query surface.
///
/// Consumes committed envelopes and keeps one immutable record per
/// `SweetPurchased` event, keyed by the event id. Only ever inserts:
/// corrections would arrive as new compensating events, never as edits.
/// Listings use a deterministic total order (purchase time descending,
/// record id descending as the tie-break; ids are time-ordered UUIDv7),
/// so repeated reads of an unchanged ledger return identical results.
#[derive(Debug)]
pub struct PurchaseHistoryProjection<S>
where
    S: KeyValueStore<Uuid, PurchaseRecord>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> PurchaseHistoryProjection<S>
where
    S: KeyValueStore<Uuid, PurchaseRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// A purchaser's history, most recent first.
    pub fn for_purchaser(&self, purchaser_id: PurchaserId) -> Vec<PurchaseRecord> {
        self.sorted(|r| r.purchaser_id == purchaser_id)
    }

    /// All purchases of one sweet, most recent first.
    pub fn for_sweet(&self, sweet_id: SweetId) -> Vec<PurchaseRecord> {
        self.sorted(|r| r.sweet_id == sweet_id)
    }

    /// Sum of a purchaser's frozen purchase totals.
    pub fn total_spent(&self, purchaser_id: PurchaserId) -> Money {
        self.store
            .list()
            .into_iter()
            .filter(|r| r.purchaser_id == purchaser_id)
            .fold(Money::ZERO, |acc, r| acc.saturating_add(r.total_price))
    }

    fn sorted(&self, keep: impl Fn(&PurchaseRecord) -> bool) -> Vec<PurchaseRecord> {
        let mut records: Vec<_> = self.store.list().into_iter().filter(|r| keep(r)).collect();
        records.sort_by(|a, b| {
            b.purchased_at
                .cmp(&a.purchased_at)
                .then_with(|| b.purchase_id.cmp(&a.purchase_id))
        });
        records
    }

    /// Apply a published envelope into the projection.
    ///
    /// Non-purchase sweet events advance the cursor without producing a
    /// record. Idempotent for at-least-once delivery (replays <= cursor are
    /// ignored).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), PurchaseHistoryProjectionError> {
        let stream_id = envelope.stream_id;
        let revision = envelope.revision;

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&stream_id).unwrap_or(&0);

            if revision == 0 {
                return Err(PurchaseHistoryProjectionError::NonMonotonicRevision {
                    last,
                    found: revision,
                });
            }

            if revision <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if revision != last + 1 && last != 0 {
                return Err(PurchaseHistoryProjectionError::NonMonotonicRevision {
                    last,
                    found: revision,
                });
            }

            let event: SweetEvent = serde_json::from_value(envelope.payload.clone())
                .map_err(|e| PurchaseHistoryProjectionError::Deserialize(e.to_string()))?;

            if let SweetEvent::SweetPurchased(e) = event {
                if e.sweet_id.0 != stream_id {
                    return Err(PurchaseHistoryProjectionError::StreamMismatch(
                        "event sweet_id does not match envelope stream_id".to_string(),
                    ));
                }

                self.store.upsert(
                    envelope.event_id,
                    PurchaseRecord {
                        purchase_id: envelope.event_id,
                        sweet_id: e.sweet_id,
                        purchaser_id: e.purchaser_id,
                        name: e.name,
                        category: e.category,
                        quantity: e.quantity,
                        unit_price: e.unit_price,
                        total_price: e.total_price,
                        purchased_at: e.occurred_at,
                    },
                );
            }

            // Advance cursor after successful apply.
            cursors.insert(stream_id, revision);
        }

        Ok(())
    }

    /// Rebuild the ledger view from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), PurchaseHistoryProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.store.clear();

        // Deterministic replay order: stream, then revision.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (e.stream_id.uuid().into_bytes(), e.revision));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
