use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sweetshop_core::AggregateId;

/// What the bus delivers: one committed event plus the stream coordinates a
/// consumer needs to apply it idempotently.
///
/// `revision` is the event's position in its stream, assigned by the store
/// at commit time; projections keep a per-stream cursor against it so that
/// redelivered envelopes fall out as no-ops. The payload stays generic so
/// infrastructure can move envelopes around without knowing any domain
/// types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub stream_id: AggregateId,
    pub stream_type: String,
    /// Position in the stream; starts at 1 and never repeats or reorders.
    pub revision: u64,
    pub payload: E,
}
