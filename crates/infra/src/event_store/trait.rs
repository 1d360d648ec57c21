use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use sweetshop_core::{AggregateId, ExpectedVersion};
use sweetshop_events::{Event, EventEnvelope};

/// An event that has been decided but is not yet durable.
///
/// Carries everything the store needs except a revision, which only the
/// winning append can assign. [`PendingEvent::from_domain`] freezes a typed
/// domain event into JSON together with the metadata needed to decode it
/// again later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub event_id: Uuid,
    pub stream_id: AggregateId,
    pub stream_type: String,

    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl PendingEvent {
    pub fn from_domain<E>(
        stream_id: AggregateId,
        stream_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::Malformed(format!("event payload would not serialize: {e}"))
        })?;

        Ok(Self {
            event_id,
            stream_id,
            stream_type: stream_type.into(),
            event_type: event.event_type().to_string(),
            schema_version: event.schema_version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// A durable event at a fixed position in its stream.
///
/// Revisions start at 1, increase by one per event, and never change once
/// assigned; they are what an `ExpectedVersion::Exact` append is compared
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEvent {
    pub event_id: Uuid,
    pub stream_id: AggregateId,
    pub stream_type: String,

    /// Position in the stream.
    pub revision: u64,

    pub event_type: String,
    pub schema_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl CommittedEvent {
    /// Package for publication on the bus.
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope {
            event_id: self.event_id,
            stream_id: self.stream_id,
            stream_type: self.stream_type.clone(),
            revision: self.revision,
            payload: self.payload.clone(),
        }
    }
}

/// Failures of the store itself, as opposed to domain outcomes.
///
/// `VersionConflict` is the one the purchase path leans on: another writer
/// moved the stream head after we read it, so the caller should reload and
/// decide again.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("stream version conflict: {0}")]
    VersionConflict(String),

    #[error("stream type mismatch: {0}")]
    StreamTypeMismatch(String),

    #[error("malformed append: {0}")]
    Malformed(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Append-only storage of event streams, one stream per aggregate.
///
/// Contract for implementations:
/// - a batch commits atomically or not at all;
/// - revisions are assigned contiguously from the head upward;
/// - of two appends expecting the same revision, at most one commits; the
///   loser gets `VersionConflict`. This is the conditional-update primitive
///   everything above builds on.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<CommittedEvent>, EventStoreError>;

    /// The full stream in revision order; empty if the stream was never
    /// written.
    fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<CommittedEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<CommittedEvent>, EventStoreError> {
        (**self).append(events, expected)
    }

    fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<CommittedEvent>, EventStoreError> {
        (**self).read_stream(stream_id)
    }
}
