use std::collections::HashMap;
use std::sync::Mutex;

use sweetshop_core::{AggregateId, ExpectedVersion};

use super::r#trait::{CommittedEvent, EventStore, EventStoreError, PendingEvent};

/// HashMap-backed store for tests and single-process wiring.
///
/// One mutex guards the whole map, so the revision check and the append
/// form a single critical section: two appends expecting the same revision
/// serialize, and the loser gets `VersionConflict`, exactly like the
/// Postgres store's unique index.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<AggregateId, Vec<CommittedEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The single (stream id, stream type) a batch targets, or `Malformed` if
/// the batch mixes streams.
fn batch_stream(events: &[PendingEvent]) -> Result<(AggregateId, String), EventStoreError> {
    let first = &events[0];
    for e in events {
        if e.stream_id != first.stream_id || e.stream_type != first.stream_type {
            return Err(EventStoreError::Malformed(
                "append batch spans more than one stream".to_string(),
            ));
        }
    }
    Ok((first.stream_id, first.stream_type.clone()))
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<CommittedEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        let (stream_id, stream_type) = batch_stream(&events)?;

        let mut streams = self
            .streams
            .lock()
            .map_err(|_| EventStoreError::Backend("store lock poisoned".to_string()))?;
        let stream = streams.entry(stream_id).or_default();

        if let Some(head) = stream.last() {
            if head.stream_type != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "stream is '{}', append says '{}'",
                    head.stream_type, stream_type
                )));
            }
        }

        let head = stream.last().map_or(0, |e| e.revision);
        if !expected.is_satisfied_by(head) {
            return Err(EventStoreError::VersionConflict(format!(
                "expected {expected:?}, stream head is {head}"
            )));
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in events.into_iter().enumerate() {
            let event = CommittedEvent {
                event_id: e.event_id,
                stream_id: e.stream_id,
                stream_type: e.stream_type,
                revision: head + 1 + offset as u64,
                event_type: e.event_type,
                schema_version: e.schema_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            stream.push(event.clone());
            committed.push(event);
        }

        Ok(committed)
    }

    fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<CommittedEvent>, EventStoreError> {
        let streams = self
            .streams
            .lock()
            .map_err(|_| EventStoreError::Backend("store lock poisoned".to_string()))?;

        Ok(streams.get(&stream_id).cloned().unwrap_or_default())
    }
}
