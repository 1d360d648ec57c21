//! Postgres-backed event store.
//!
//! Streams live in one `event_log` table; the `UNIQUE (stream_id, revision)`
//! index is the authoritative arbiter when two purchases race for the same
//! stream head. The store checks the head revision inside a transaction and
//! inserts from there; if another transaction commits in between, the unique
//! index rejects the insert (SQLSTATE 23505) and the caller sees
//! `VersionConflict`. Every other database, pool, or network fault surfaces
//! as `Backend`.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE event_log (
//!     event_id        UUID PRIMARY KEY,
//!     stream_id       UUID        NOT NULL,
//!     stream_type     TEXT        NOT NULL,
//!     revision        BIGINT      NOT NULL CHECK (revision > 0),
//!     event_type      TEXT        NOT NULL,
//!     schema_version  INTEGER     NOT NULL,
//!     occurred_at     TIMESTAMPTZ NOT NULL,
//!     payload         JSONB       NOT NULL,
//!     recorded_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     UNIQUE (stream_id, revision)
//! );
//! ```

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use sweetshop_core::{AggregateId, ExpectedVersion};

use super::r#trait::{CommittedEvent, EventStore, EventStoreError, PendingEvent};

/// Durable append-only event store on a SQLx connection pool.
///
/// `PgPool` is internally reference-counted, so the store is cheap to clone
/// and safe to share across threads.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a full stream in revision order; empty if never written.
    #[instrument(skip(self), fields(stream_id = %stream_id), err)]
    pub async fn fetch_stream(
        &self,
        stream_id: AggregateId,
    ) -> Result<Vec<CommittedEvent>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, stream_id, stream_type, revision,
                   event_type, schema_version, occurred_at, payload
            FROM event_log
            WHERE stream_id = $1
            ORDER BY revision
            "#,
        )
        .bind(stream_id.uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend_error("fetch_stream", &e))?;

        rows.iter().map(decode_row).collect()
    }

    /// Append a batch with the optimistic head check.
    ///
    /// On success every event in the batch is durable with a contiguous
    /// revision; on any error the transaction rolls back and the stream is
    /// untouched.
    #[instrument(
        skip(self, events),
        fields(stream_id = %stream_id, batch = events.len(), expected = ?expected),
        err
    )]
    pub async fn append_events(
        &self,
        stream_id: AggregateId,
        events: Vec<PendingEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<CommittedEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        if events.iter().any(|e| e.stream_id != stream_id) {
            return Err(EventStoreError::Malformed(
                "append batch spans more than one stream".to_string(),
            ));
        }
        let stream_type = events[0].stream_type.clone();

        // Dropping the transaction without committing rolls it back, so
        // every early return below leaves the stream untouched.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| backend_error("begin", &e))?;

        let head_row = sqlx::query(
            r#"
            SELECT revision, stream_type
            FROM event_log
            WHERE stream_id = $1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(stream_id.uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| backend_error("read_head", &e))?;

        let mut head = 0u64;
        if let Some(row) = head_row {
            head = row
                .try_get::<i64, _>("revision")
                .map_err(|e| backend_error("read_head", &e))? as u64;
            let existing: String = row
                .try_get("stream_type")
                .map_err(|e| backend_error("read_head", &e))?;
            if existing != stream_type {
                return Err(EventStoreError::StreamTypeMismatch(format!(
                    "stream is '{existing}', append says '{stream_type}'"
                )));
            }
        }

        if !expected.is_satisfied_by(head) {
            return Err(EventStoreError::VersionConflict(format!(
                "expected {expected:?}, stream head is {head}"
            )));
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in events.into_iter().enumerate() {
            let revision = head + 1 + offset as u64;

            sqlx::query(
                r#"
                INSERT INTO event_log (
                    event_id, stream_id, stream_type, revision,
                    event_type, schema_version, occurred_at, payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(e.event_id)
            .bind(e.stream_id.uuid())
            .bind(&e.stream_type)
            .bind(revision as i64)
            .bind(&e.event_type)
            .bind(e.schema_version as i32)
            .bind(e.occurred_at)
            .bind(&e.payload)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    // A concurrent transaction won the race for this slot.
                    EventStoreError::VersionConflict(format!(
                        "revision {revision} already committed by another writer"
                    ))
                } else {
                    backend_error("insert_event", &err)
                }
            })?;

            committed.push(CommittedEvent {
                event_id: e.event_id,
                stream_id: e.stream_id,
                stream_type: e.stream_type,
                revision,
                event_type: e.event_type,
                schema_version: e.schema_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            });
        }

        tx.commit()
            .await
            .map_err(|e| backend_error("commit", &e))?;

        Ok(committed)
    }
}

fn decode_row(row: &PgRow) -> Result<CommittedEvent, EventStoreError> {
    let decode = |e: sqlx::Error| backend_error("decode_row", &e);

    Ok(CommittedEvent {
        event_id: row.try_get("event_id").map_err(decode)?,
        stream_id: AggregateId::from_uuid(row.try_get("stream_id").map_err(decode)?),
        stream_type: row.try_get("stream_type").map_err(decode)?,
        revision: row.try_get::<i64, _>("revision").map_err(decode)? as u64,
        event_type: row.try_get("event_type").map_err(decode)?,
        schema_version: row.try_get::<i32, _>("schema_version").map_err(decode)? as u32,
        occurred_at: row.try_get("occurred_at").map_err(decode)?,
        payload: row.try_get("payload").map_err(decode)?,
    })
}

fn backend_error(operation: &str, err: &sqlx::Error) -> EventStoreError {
    EventStoreError::Backend(format!("{operation}: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

/// Bridge for the synchronous `EventStore` trait.
///
/// Must be called from inside a tokio runtime; the async work runs on the
/// current runtime's handle.
impl EventStore for PostgresEventStore {
    fn append(
        &self,
        events: Vec<PendingEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<CommittedEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        let stream_id = events[0].stream_id;
        runtime_handle()?.block_on(self.append_events(stream_id, events, expected))
    }

    fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<CommittedEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.fetch_stream(stream_id))
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, EventStoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        EventStoreError::Backend(
            "PostgresEventStore needs a tokio runtime on the calling thread".to_string(),
        )
    })
}
