use std::collections::HashMap;
use std::sync::RwLock;

use shopkeeper_core::{AggregateId, CompanyId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    company_id: CompanyId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Default)]
struct Streams {
    by_key: HashMap<StreamKey, Vec<StoredEvent>>,
    /// Every committed event in commit order.
    log: Vec<StoredEvent>,
}

/// In-memory append-only event store.
///
/// A batch is checked in full under the write lock before anything is pushed,
/// so readers never observe half of a batch.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: Option<&Vec<StoredEvent>>) -> u64 {
        stream
            .and_then(|s| s.last())
            .map(|e| e.sequence_number)
            .unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        // Pass 1: check every part against the versions the earlier parts leave behind.
        let mut planned: HashMap<StreamKey, (u64, String)> = HashMap::new();
        for part in &batch {
            part.validate()?;
            let Some(first) = part.events.first() else {
                continue;
            };
            let key = StreamKey {
                company_id: part.company_id,
                aggregate_id: part.aggregate_id,
            };
            let existing = streams.by_key.get(&key);
            let (current, stream_type) = match planned.get(&key) {
                Some((version, ty)) => (*version, Some(ty.clone())),
                None => (
                    Self::current_version(existing),
                    existing.and_then(|s| s.first()).map(|e| e.aggregate_type.clone()),
                ),
            };

            if !part.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {}/{}: expected {:?}, found {current}",
                    part.company_id, part.aggregate_id, part.expected_version
                )));
            }
            if let Some(ty) = &stream_type {
                if *ty != first.aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{ty}', attempted append with '{}'",
                        first.aggregate_type
                    )));
                }
            }

            planned.insert(
                key,
                (
                    current + part.events.len() as u64,
                    stream_type.unwrap_or_else(|| first.aggregate_type.clone()),
                ),
            );
        }

        // Pass 2: assign sequence numbers and append.
        let mut committed = Vec::new();
        for part in batch {
            let key = StreamKey {
                company_id: part.company_id,
                aggregate_id: part.aggregate_id,
            };
            let mut next = Self::current_version(streams.by_key.get(&key)) + 1;
            for e in part.events {
                let stored = e.into_stored(next);
                next += 1;
                streams.by_key.entry(key).or_default().push(stored.clone());
                streams.log.push(stored.clone());
                committed.push(stored);
            }
        }

        Ok(committed)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            company_id,
            aggregate_id,
        };

        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(streams.by_key.get(&key).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(streams.log.clone())
    }
}
