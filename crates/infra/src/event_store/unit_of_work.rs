//! Per-call transaction boundary over an event store.
//!
//! Appends are staged in memory; reads through the unit of work see staged
//! events on top of committed ones. `commit` hands every staged part to the
//! store as one atomic batch. Dropping the unit of work without committing
//! discards everything it staged.

use shopkeeper_core::{AggregateId, CompanyId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

pub struct UnitOfWork<'s, S: EventStore + ?Sized> {
    store: &'s S,
    staged: Vec<StreamAppend>,
}

impl<'s, S: EventStore + ?Sized> UnitOfWork<'s, S> {
    pub fn begin(store: &'s S) -> Self {
        Self {
            store,
            staged: Vec::new(),
        }
    }

    /// Committed events followed by the ones staged here, numbered as they
    /// would be once committed.
    pub fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut stream = self.store.load_stream(company_id, aggregate_id)?;
        let mut next = stream.last().map(|e| e.sequence_number).unwrap_or(0) + 1;
        for part in self.staged_parts(company_id, aggregate_id) {
            for e in &part.events {
                stream.push(e.clone().into_stored(next));
                next += 1;
            }
        }
        Ok(stream)
    }

    /// Stage events for one stream; returns the stream version after them.
    ///
    /// `expected_version` is checked against the staged view right away, and
    /// the resolved version is checked again by the store at commit.
    pub fn stage(
        &mut self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
        expected_version: ExpectedVersion,
        events: Vec<UncommittedEvent>,
    ) -> Result<u64, EventStoreError> {
        let committed = self.store.load_stream(company_id, aggregate_id)?;
        let staged: usize = self
            .staged_parts(company_id, aggregate_id)
            .map(|p| p.events.len())
            .sum();
        let current = committed.last().map(|e| e.sequence_number).unwrap_or(0) + staged as u64;

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "stream {company_id}/{aggregate_id}: expected {expected_version:?}, found {current}"
            )));
        }
        if events.is_empty() {
            return Ok(current);
        }

        let part = StreamAppend {
            company_id,
            aggregate_id,
            expected_version: ExpectedVersion::Exact(current),
            events,
        };
        part.validate()?;
        let version = current + part.events.len() as u64;
        self.staged.push(part);
        Ok(version)
    }

    /// Number of staged events across all streams.
    pub fn staged_len(&self) -> usize {
        self.staged.iter().map(|p| p.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Append everything staged as one batch. Nothing is written on error.
    pub fn commit(mut self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let batch = std::mem::take(&mut self.staged);
        if batch.is_empty() {
            return Ok(vec![]);
        }
        self.store.append_batch(batch)
    }

    /// Discard everything staged.
    pub fn rollback(mut self) {
        let discarded = std::mem::take(&mut self.staged);
        tracing::debug!(parts = discarded.len(), "unit of work rolled back");
    }

    fn staged_parts(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> impl Iterator<Item = &StreamAppend> {
        self.staged
            .iter()
            .filter(move |p| p.company_id == company_id && p.aggregate_id == aggregate_id)
    }
}

impl<S: EventStore + ?Sized> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            tracing::debug!(
                events = self.staged_len(),
                "unit of work dropped without commit; staged events discarded"
            );
        }
    }
}
