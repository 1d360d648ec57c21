use chrono::{DateTime, Utc};

/// A fact the domain has committed to.
///
/// Implemented by each aggregate's event enum. The contract is deliberately
/// small: a stable name for routing and storage, a schema version so old
/// payloads stay decodable after the shape evolves, and the business time
/// at which the fact happened. Events carry no behavior and are never
/// edited after commit.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable, dot-separated type name (e.g. "catalog.sweet.purchased").
    fn event_type(&self) -> &'static str;

    /// Version of this event type's payload shape.
    fn schema_version(&self) -> u32;

    /// Business time: when the fact happened, not when it was stored.
    fn occurred_at(&self) -> DateTime<Utc>;
}
