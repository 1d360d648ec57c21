//! Catalog administration service.
//!
//! Create/update/restock/archive flows for the admin screen, dispatched
//! through the same pipeline as purchases. Restock and detail updates share
//! the purchases' conditional-update primitive with a bounded retry, so an
//! admin topping up stock while buyers are checking out cannot lose either
//! side's write.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use sweetshop_catalog::{
    ArchiveSweet, CreateSweet, RestockSweet, SWEET_AGGREGATE_TYPE, Sweet, SweetCommand, SweetId,
    UpdateSweetDetails,
};
use sweetshop_core::{AggregateId, Money};
use sweetshop_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;

/// How many optimistic rounds an admin mutation runs before giving up.
const MAX_ADMIN_ATTEMPTS: u32 = 5;

/// Fields for a new catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSweet {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub quantity: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Replacement descriptive fields for an existing entry (quantity excluded;
/// stock only moves through restock and purchase).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweetDetails {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Administrative command surface over the sweet catalog.
#[derive(Debug)]
pub struct CatalogAdmin<S, B> {
    dispatcher: CommandDispatcher<S, B>,
}

impl<S, B> CatalogAdmin<S, B> {
    pub fn new(dispatcher: CommandDispatcher<S, B>) -> Self {
        Self { dispatcher }
    }
}

impl<S, B> CatalogAdmin<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Add a sweet to the catalog, returning its new identifier.
    pub fn create_sweet(&self, new: NewSweet) -> Result<SweetId, DispatchError> {
        let sweet_id = SweetId::new(AggregateId::new());
        let command = SweetCommand::CreateSweet(CreateSweet {
            sweet_id,
            name: new.name,
            category: new.category,
            price: new.price,
            quantity: new.quantity,
            description: new.description,
            image_url: new.image_url,
            occurred_at: Utc::now(),
        });

        self.dispatch_once(sweet_id, command)?;
        info!(sweet_id = %sweet_id, "sweet created");
        Ok(sweet_id)
    }

    /// Rewrite an entry's descriptive fields and list price.
    pub fn update_details(
        &self,
        sweet_id: SweetId,
        details: SweetDetails,
    ) -> Result<(), DispatchError> {
        self.dispatch_with_retry(sweet_id, || {
            SweetCommand::UpdateSweetDetails(UpdateSweetDetails {
                sweet_id,
                name: details.name.clone(),
                category: details.category.clone(),
                price: details.price,
                description: details.description.clone(),
                image_url: details.image_url.clone(),
                occurred_at: Utc::now(),
            })
        })?;
        info!(sweet_id = %sweet_id, "sweet details updated");
        Ok(())
    }

    /// Add `amount` units of stock.
    pub fn restock(&self, sweet_id: SweetId, amount: i64) -> Result<(), DispatchError> {
        self.dispatch_with_retry(sweet_id, || {
            SweetCommand::RestockSweet(RestockSweet {
                sweet_id,
                amount,
                occurred_at: Utc::now(),
            })
        })?;
        info!(sweet_id = %sweet_id, amount, "sweet restocked");
        Ok(())
    }

    /// Remove a sweet from sale.
    ///
    /// Streams are append-only, so this is the catalog's delete: the item
    /// drops out of the storefront view and rejects further commands, while
    /// its purchase history stays intact.
    pub fn archive(&self, sweet_id: SweetId) -> Result<(), DispatchError> {
        let command = SweetCommand::ArchiveSweet(ArchiveSweet {
            sweet_id,
            occurred_at: Utc::now(),
        });

        self.dispatch_once(sweet_id, command)?;
        info!(sweet_id = %sweet_id, "sweet archived");
        Ok(())
    }

    fn dispatch_once(&self, sweet_id: SweetId, command: SweetCommand) -> Result<(), DispatchError> {
        self.dispatcher
            .dispatch::<Sweet>(sweet_id.0, SWEET_AGGREGATE_TYPE, command, |id| {
                Sweet::empty(SweetId::new(id))
            })?;
        Ok(())
    }

    /// Re-dispatch on optimistic-concurrency conflicts, up to the admin
    /// attempt ceiling. Only used for commands whose domain logic cannot
    /// itself produce a conflict, so a surviving `Concurrency` error really
    /// means sustained contention.
    fn dispatch_with_retry(
        &self,
        sweet_id: SweetId,
        make_command: impl Fn() -> SweetCommand,
    ) -> Result<(), DispatchError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.dispatch_once(sweet_id, make_command()) {
                Ok(()) => return Ok(()),
                Err(DispatchError::Concurrency(reason)) => {
                    if attempts >= MAX_ADMIN_ATTEMPTS {
                        return Err(DispatchError::Concurrency(reason));
                    }
                    debug!(
                        sweet_id = %sweet_id,
                        attempt = attempts,
                        reason = %reason,
                        "admin mutation lost a concurrency race; retrying"
                    );
                }
                Err(other) => return Err(other),
            }
        }
    }
}
