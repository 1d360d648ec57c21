use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, PurchaserId};
use sweetshop_events::Event;

/// Stream/aggregate type identifier for `Sweet` streams.
pub const SWEET_AGGREGATE_TYPE: &str = "catalog.sweet";

/// Catalog item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweetId(pub AggregateId);

impl SweetId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SweetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Sweet.
///
/// Holds the authoritative price and stock quantity for one catalog item.
/// The purchase decision lives here so the total price is always computed
/// from the price and quantity read in the same atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweet {
    id: SweetId,
    name: String,
    category: String,
    price: Money,
    quantity: i64,
    description: Option<String>,
    image_url: Option<String>,
    version: u64,
    created: bool,
    archived: bool,
}

impl Sweet {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SweetId) -> Self {
        Self {
            id,
            name: String::new(),
            category: String::new(),
            price: Money::ZERO,
            quantity: 0,
            description: None,
            image_url: None,
            version: 0,
            created: false,
            archived: false,
        }
    }

    pub fn id_typed(&self) -> SweetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    /// Check if the sweet can currently be sold at all.
    pub fn is_in_stock(&self) -> bool {
        self.created && !self.archived && self.quantity > 0
    }
}

impl AggregateRoot for Sweet {
    type Id = SweetId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSweet {
    pub sweet_id: SweetId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub quantity: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateSweetDetails.
///
/// Rewrites descriptive fields and the list price. Never touches quantity;
/// stock only moves through restock and purchase commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSweetDetails {
    pub sweet_id: SweetId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RestockSweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockSweet {
    pub sweet_id: SweetId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PurchaseSweet.
///
/// The conditional decrement: emits a purchase event only if stock covers
/// the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSweet {
    pub sweet_id: SweetId,
    pub purchaser_id: PurchaserId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveSweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSweet {
    pub sweet_id: SweetId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweetCommand {
    CreateSweet(CreateSweet),
    UpdateSweetDetails(UpdateSweetDetails),
    RestockSweet(RestockSweet),
    PurchaseSweet(PurchaseSweet),
    ArchiveSweet(ArchiveSweet),
}

/// Event: SweetCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetCreated {
    pub sweet_id: SweetId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub quantity: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SweetDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetDetailsUpdated {
    pub sweet_id: SweetId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SweetRestocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetRestocked {
    pub sweet_id: SweetId,
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SweetPurchased.
///
/// A single fact that is both the stock decrement and the ledger entry.
/// `unit_price` and `total_price` are frozen here: the purchase history must
/// not change when the item is later repriced, renamed, or archived, so the
/// event snapshots name and category too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetPurchased {
    pub sweet_id: SweetId,
    pub purchaser_id: PurchaserId,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SweetArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetArchived {
    pub sweet_id: SweetId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweetEvent {
    SweetCreated(SweetCreated),
    SweetDetailsUpdated(SweetDetailsUpdated),
    SweetRestocked(SweetRestocked),
    SweetPurchased(SweetPurchased),
    SweetArchived(SweetArchived),
}

impl Event for SweetEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SweetEvent::SweetCreated(_) => "catalog.sweet.created",
            SweetEvent::SweetDetailsUpdated(_) => "catalog.sweet.details_updated",
            SweetEvent::SweetRestocked(_) => "catalog.sweet.restocked",
            SweetEvent::SweetPurchased(_) => "catalog.sweet.purchased",
            SweetEvent::SweetArchived(_) => "catalog.sweet.archived",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SweetEvent::SweetCreated(e) => e.occurred_at,
            SweetEvent::SweetDetailsUpdated(e) => e.occurred_at,
            SweetEvent::SweetRestocked(e) => e.occurred_at,
            SweetEvent::SweetPurchased(e) => e.occurred_at,
            SweetEvent::SweetArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sweet {
    type Command = SweetCommand;
    type Event = SweetEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SweetEvent::SweetCreated(e) => {
                self.id = e.sweet_id;
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.price = e.price;
                self.quantity = e.quantity;
                self.description = e.description.clone();
                self.image_url = e.image_url.clone();
                self.created = true;
                self.archived = false;
            }
            SweetEvent::SweetDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.price = e.price;
                self.description = e.description.clone();
                self.image_url = e.image_url.clone();
            }
            SweetEvent::SweetRestocked(e) => {
                self.quantity += e.amount;
            }
            SweetEvent::SweetPurchased(e) => {
                self.quantity -= e.quantity;
            }
            SweetEvent::SweetArchived(_) => {
                self.archived = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SweetCommand::CreateSweet(cmd) => self.handle_create(cmd),
            SweetCommand::UpdateSweetDetails(cmd) => self.handle_update(cmd),
            SweetCommand::RestockSweet(cmd) => self.handle_restock(cmd),
            SweetCommand::PurchaseSweet(cmd) => self.handle_purchase(cmd),
            SweetCommand::ArchiveSweet(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Sweet {
    fn ensure_sweet_id(&self, sweet_id: SweetId) -> Result<(), DomainError> {
        if self.id != sweet_id {
            return Err(DomainError::invariant("sweet_id mismatch"));
        }
        Ok(())
    }

    /// An archived sweet behaves like a deleted row: every later command
    /// resolves it as missing.
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.archived {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSweet) -> Result<Vec<SweetEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sweet already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if cmd.quantity < 0 {
            return Err(DomainError::invalid_quantity(cmd.quantity));
        }

        Ok(vec![SweetEvent::SweetCreated(SweetCreated {
            sweet_id: cmd.sweet_id,
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            price: cmd.price,
            quantity: cmd.quantity,
            description: cmd.description.clone(),
            image_url: cmd.image_url.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateSweetDetails) -> Result<Vec<SweetEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_sweet_id(cmd.sweet_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        Ok(vec![SweetEvent::SweetDetailsUpdated(SweetDetailsUpdated {
            sweet_id: cmd.sweet_id,
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            price: cmd.price,
            description: cmd.description.clone(),
            image_url: cmd.image_url.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_restock(&self, cmd: &RestockSweet) -> Result<Vec<SweetEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_sweet_id(cmd.sweet_id)?;

        if cmd.amount <= 0 {
            return Err(DomainError::invalid_quantity(cmd.amount));
        }

        Ok(vec![SweetEvent::SweetRestocked(SweetRestocked {
            sweet_id: cmd.sweet_id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_purchase(&self, cmd: &PurchaseSweet) -> Result<Vec<SweetEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_sweet_id(cmd.sweet_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::invalid_quantity(cmd.quantity));
        }

        if cmd.quantity > self.quantity {
            return Err(DomainError::insufficient_stock(cmd.quantity, self.quantity));
        }

        // Price is read from this aggregate's current state, never from the
        // caller; the total is frozen into the event.
        let total_price = self.price.total_for(cmd.quantity as u64)?;

        Ok(vec![SweetEvent::SweetPurchased(SweetPurchased {
            sweet_id: cmd.sweet_id,
            purchaser_id: cmd.purchaser_id,
            name: self.name.clone(),
            category: self.category.clone(),
            quantity: cmd.quantity,
            unit_price: self.price,
            total_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveSweet) -> Result<Vec<SweetEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_sweet_id(cmd.sweet_id)?;

        if self.archived {
            return Err(DomainError::conflict("sweet is already archived"));
        }

        Ok(vec![SweetEvent::SweetArchived(SweetArchived {
            sweet_id: cmd.sweet_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
