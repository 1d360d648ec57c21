//! Command execution pipeline.
//!
//! One path for every write: read the stream, fold it into the aggregate,
//! let the aggregate decide, append the decision at the revision the read
//! saw, then hand the committed events to the bus. The expected revision
//! travels from the read to the append, so a decision made on stale state
//! cannot commit; it surfaces as `Concurrency` and the caller re-dispatches
//! against fresher history. That is the entire conditional-decrement story
//! for stock: a purchase commits only if the quantity it checked is still
//! the quantity on hand.
//!
//! No IO lives here. The store and bus arrive as traits, so the pipeline
//! runs unchanged against the in-memory fakes in tests and Postgres in
//! production.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use sweetshop_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use sweetshop_events::{EventBus, EventEnvelope};

use crate::event_store::{CommittedEvent, EventStore, EventStoreError, PendingEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (e.g. stale aggregate version).
    Concurrency(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain-level not found.
    NotFound,
    /// Quantity out of range (zero, negative, over cap).
    InvalidQuantity { requested: i64 },
    /// Stock cannot cover the requested units.
    InsufficientStock { requested: i64, available: i64 },
    /// Historical event payloads would not decode into the aggregate's
    /// event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry
    /// may duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::VersionConflict(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvalidQuantity { requested } => {
                DispatchError::InvalidQuantity { requested }
            }
            DomainError::InsufficientStock {
                requested,
                available,
            } => DispatchError::InsufficientStock {
                requested,
                available,
            },
        }
    }
}

/// Shared command execution engine for event-sourced aggregates.
///
/// Sits between the callers (purchase coordinator, catalog admin) and the
/// infrastructure, providing one execution model for every command:
///
/// - events are persisted before publication; a failed append publishes
///   nothing and changes nothing;
/// - each command touches exactly one stream, appended at the exact
///   revision the read observed;
/// - publication is at-least-once; projections tolerate replays.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run one command through read → rehydrate → decide → append → publish.
    ///
    /// The `seed` factory keeps the dispatcher generic over aggregate
    /// types: domain code controls construction (e.g. `Sweet::empty(id)`).
    /// Returns the committed events on success. A concurrent modification
    /// surfaces as `DispatchError::Concurrency`; callers retry by
    /// re-dispatching (which re-reads) or report a conflict.
    pub fn dispatch<A>(
        &self,
        stream_id: AggregateId,
        stream_type: impl Into<String>,
        command: A::Command,
        seed: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<CommittedEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: sweetshop_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.read_stream(stream_id)?;
        let head = verify_stream(stream_id, &history)?;

        let mut aggregate = seed(stream_id);
        for event in decode_history::<A>(&history)? {
            aggregate.apply(&event);
        }

        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let stream_type = stream_type.into();
        let pending = decided
            .iter()
            .map(|event| {
                PendingEvent::from_domain(stream_id, stream_type.clone(), Uuid::now_v7(), event)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(pending, ExpectedVersion::Exact(head))?;

        for event in &committed {
            self.bus
                .publish(event.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

/// The head revision of a loaded stream, after checking it is sane: every
/// event belongs to the requested stream and revisions climb strictly from
/// at least 1.
fn verify_stream(
    stream_id: AggregateId,
    history: &[CommittedEvent],
) -> Result<u64, DispatchError> {
    let mut head = 0u64;
    for event in history {
        if event.stream_id != stream_id {
            return Err(DispatchError::Store(EventStoreError::Malformed(format!(
                "stream {stream_id} contains an event for {}",
                event.stream_id
            ))));
        }
        if event.revision <= head {
            return Err(DispatchError::Store(EventStoreError::Malformed(format!(
                "revisions must climb: {} after {head}",
                event.revision
            ))));
        }
        head = event.revision;
    }
    Ok(head)
}

fn decode_history<A>(history: &[CommittedEvent]) -> Result<Vec<A::Event>, DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    history
        .iter()
        .map(|event| {
            serde_json::from_value(event.payload.clone())
                .map_err(|e| DispatchError::Deserialize(e.to_string()))
        })
        .collect()
}
