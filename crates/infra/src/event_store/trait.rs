use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use shopkeeper_core::{AggregateId, CompanyId, ExpectedVersion};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// ## Event Lifecycle
///
/// 1. **Domain event**: decided by an aggregate's `handle()`
/// 2. **UncommittedEvent**: wrapped with stream metadata, staged in a unit of work
/// 3. **StoredEvent**: committed with an assigned `sequence_number`
/// 4. **EventEnvelope**: published to the bus and fed to projections
///
/// Use `UncommittedEvent::from_typed()` to build one from a typed domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are per stream (`company_id` + `aggregate_id`), start at 1
/// and never have gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub company_id: CompanyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into a company-scoped envelope for publication.
    pub fn to_envelope(&self) -> shopkeeper_events::EventEnvelope<JsonValue> {
        shopkeeper_events::EventEnvelope::new(
            self.event_id,
            self.company_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.event_type.clone(),
            self.payload.clone(),
        )
    }
}

/// Event store operation error.
///
/// These are infrastructure failures (storage, concurrency, isolation) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("company isolation violation: {0}")]
    CompanyIsolation(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// One stream's share of an atomic batch.
///
/// A batch may name the same stream more than once; each part is checked
/// against the version the stream has after the parts before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAppend {
    pub company_id: CompanyId,
    pub aggregate_id: AggregateId,
    pub expected_version: ExpectedVersion,
    pub events: Vec<UncommittedEvent>,
}

impl StreamAppend {
    /// Every event must target this part's stream and carry one aggregate type.
    pub(crate) fn validate(&self) -> Result<(), EventStoreError> {
        let Some(first) = self.events.first() else {
            return Ok(());
        };
        for (idx, e) in self.events.iter().enumerate() {
            if e.company_id != self.company_id {
                return Err(EventStoreError::CompanyIsolation(format!(
                    "event at index {idx} belongs to another company"
                )));
            }
            if e.aggregate_id != self.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event at index {idx} targets another aggregate"
                )));
            }
            if e.aggregate_type != first.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch mixes aggregate types (index {idx})"
                )));
            }
        }
        Ok(())
    }
}

/// Append-only, company-scoped event store.
///
/// Streams are keyed by `(company_id, aggregate_id)`. Implementations must:
/// - enforce company isolation on reads and writes;
/// - enforce optimistic concurrency against the current stream version;
/// - assign sequence numbers from `current_version + 1` without gaps;
/// - persist a whole batch, across every stream it touches, or none of it.
pub trait EventStore: Send + Sync {
    /// Append parts to one or more streams atomically, in the given order.
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for a company + aggregate. Unknown streams are empty.
    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every committed event in commit order (projection rebuilds).
    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Append events to a single aggregate stream.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };
        let part = StreamAppend {
            company_id: first.company_id,
            aggregate_id: first.aggregate_id,
            expected_version,
            events,
        };
        self.append_batch(vec![part])
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append_batch(batch)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(company_id, aggregate_id)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all()
    }
}

impl UncommittedEvent {
    /// Wrap a typed domain event, serializing it to a JSON payload.
    pub fn from_typed<E>(
        company_id: CompanyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: shopkeeper_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            company_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    pub(crate) fn into_stored(self, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            company_id: self.company_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            sequence_number,
            event_type: self.event_type,
            event_version: self.event_version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}
