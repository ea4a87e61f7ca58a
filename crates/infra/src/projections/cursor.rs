//! Per-stream cursors that make projections idempotent.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use shopkeeper_core::{AggregateId, CompanyId};
use shopkeeper_events::EventEnvelope;

use super::ProjectionError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    company_id: CompanyId,
    aggregate_id: AggregateId,
}

/// Last applied sequence number per (company, aggregate) stream.
#[derive(Debug, Default)]
pub struct StreamCursors {
    inner: RwLock<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(true)` when the envelope is the next one of its stream, `Ok(false)`
    /// for a duplicate or replay that must be skipped.
    ///
    /// The first envelope seen for a stream may carry any positive sequence
    /// number; after that increments must be exactly one.
    pub fn accept(&self, envelope: &EventEnvelope<JsonValue>) -> Result<bool, ProjectionError> {
        let seq = envelope.sequence_number();
        let last = self.last(envelope);
        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(true)
    }

    /// Record the envelope as applied.
    pub fn advance(&self, envelope: &EventEnvelope<JsonValue>) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(Self::key(envelope), envelope.sequence_number());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }

    fn last(&self, envelope: &EventEnvelope<JsonValue>) -> u64 {
        match self.inner.read() {
            Ok(cursors) => *cursors.get(&Self::key(envelope)).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn key(envelope: &EventEnvelope<JsonValue>) -> CursorKey {
        CursorKey {
            company_id: envelope.company_id(),
            aggregate_id: envelope.aggregate_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn envelope(aggregate_id: AggregateId, seq: u64) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(Uuid::now_v7(), CompanyId::shared(), aggregate_id, "test.thing", seq, "test.thing.happened", json!({}))
    }

    #[test]
    fn duplicates_are_skipped_and_gaps_rejected() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        assert!(cursors.accept(&envelope(id, 1)).unwrap());
        cursors.advance(&envelope(id, 1));
        assert!(!cursors.accept(&envelope(id, 1)).unwrap());
        assert!(matches!(
            cursors.accept(&envelope(id, 3)),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 3 })
        ));
        assert!(cursors.accept(&envelope(id, 2)).unwrap());
    }
}
