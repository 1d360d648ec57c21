use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use sweetshop_catalog::{SweetEvent, SweetId};
use sweetshop_core::{AggregateId, Money};
use sweetshop_events::EventEnvelope;

use crate::read_model::KeyValueStore;

/// Queryable storefront read model: one row per live (non-archived) sweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweetView {
    pub sweet_id: SweetId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub quantity: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Storefront browse filter.
///
/// `search` matches name, category, or description case-insensitively;
/// `category` is an exact match; price bounds are inclusive. Empty filter
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
}

impl CatalogFilter {
    fn matches(&self, view: &SweetView) -> bool {
        let matches_search = match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                view.name.to_lowercase().contains(&term)
                    || view.category.to_lowercase().contains(&term)
                    || view
                        .description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
            None => true,
        };

        let matches_category = match &self.category {
            Some(category) => view.category == *category,
            None => true,
        };

        let matches_min = self.min_price.is_none_or(|min| view.price >= min);
        let matches_max = self.max_price.is_none_or(|max| view.price <= max);

        matches_search && matches_category && matches_min && matches_max
    }
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize sweet event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic revision (last={last}, found={found})")]
    NonMonotonicRevision { last: u64, found: u64 },
}

/// Catalog projection.
///
/// Consumes published envelopes (JSON payloads) and maintains the
/// storefront view. Archived sweets are dropped from the store and stop
/// appearing in any listing. Read models are disposable and rebuildable
/// from the event stream.
#[derive(Debug)]
pub struct CatalogProjection<S>
where
    S: KeyValueStore<SweetId, SweetView>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> CatalogProjection<S>
where
    S: KeyValueStore<SweetId, SweetView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Query the view for one sweet.
    pub fn get(&self, sweet_id: &SweetId) -> Option<SweetView> {
        self.store.get(sweet_id)
    }

    /// List all live sweets, ordered by name (id tie-break for determinism).
    pub fn list(&self) -> Vec<SweetView> {
        let mut views = self.store.list();
        views.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.sweet_id.0.uuid().cmp(&b.sweet_id.0.uuid()))
        });
        views
    }

    /// Distinct categories across live sweets, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.store.list().into_iter().map(|v| v.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// List live sweets matching `filter`, in `list()` order.
    pub fn search(&self, filter: &CatalogFilter) -> Vec<SweetView> {
        self.list()
            .into_iter()
            .filter(|v| filter.matches(v))
            .collect()
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces stream integrity (the event must belong to the envelope's
    ///   stream)
    /// - Enforces monotonic revisions per stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        let stream_id = envelope.stream_id;
        let revision = envelope.revision;

        if let Ok(mut cursors) = self.cursors.write() {
            let last = *cursors.get(&stream_id).unwrap_or(&0);

            if revision == 0 {
                return Err(CatalogProjectionError::NonMonotonicRevision {
                    last,
                    found: revision,
                });
            }

            if revision <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if revision != last + 1 && last != 0 {
                // The first event may carry any positive revision (streams
                // start at 1); after that, strict increments only.
                return Err(CatalogProjectionError::NonMonotonicRevision {
                    last,
                    found: revision,
                });
            }

            let event: SweetEvent = serde_json::from_value(envelope.payload.clone())
                .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;

            let sweet_id = event_sweet_id(&event);
            if sweet_id.0 != stream_id {
                return Err(CatalogProjectionError::StreamMismatch(
                    "event sweet_id does not match envelope stream_id".to_string(),
                ));
            }

            match event {
                SweetEvent::SweetCreated(e) => {
                    self.store.upsert(
                        e.sweet_id,
                        SweetView {
                            sweet_id: e.sweet_id,
                            name: e.name,
                            category: e.category,
                            price: e.price,
                            quantity: e.quantity,
                            description: e.description,
                            image_url: e.image_url,
                        },
                    );
                }
                SweetEvent::SweetDetailsUpdated(e) => {
                    if let Some(mut view) = self.store.get(&e.sweet_id) {
                        view.name = e.name;
                        view.category = e.category;
                        view.price = e.price;
                        view.description = e.description;
                        view.image_url = e.image_url;
                        self.store.upsert(e.sweet_id, view);
                    }
                }
                SweetEvent::SweetRestocked(e) => {
                    if let Some(mut view) = self.store.get(&e.sweet_id) {
                        view.quantity += e.amount;
                        self.store.upsert(e.sweet_id, view);
                    }
                }
                SweetEvent::SweetPurchased(e) => {
                    if let Some(mut view) = self.store.get(&e.sweet_id) {
                        view.quantity -= e.quantity;
                        self.store.upsert(e.sweet_id, view);
                    }
                }
                SweetEvent::SweetArchived(e) => {
                    self.store.remove(&e.sweet_id);
                }
            }

            // Advance cursor after successful apply.
            cursors.insert(stream_id, revision);
        }

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), CatalogProjectionError> {
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

fn event_sweet_id(event: &SweetEvent) -> SweetId {
    match event {
        SweetEvent::SweetCreated(e) => e.sweet_id,
        SweetEvent::SweetDetailsUpdated(e) => e.sweet_id,
        SweetEvent::SweetRestocked(e) => e.sweet_id,
        SweetEvent::SweetPurchased(e) => e.sweet_id,
        SweetEvent::SweetArchived(e) => e.sweet_id,
    }
}
