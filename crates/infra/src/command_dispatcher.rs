//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the stream through the unit of work (committed + staged events)
//!   ↓
//! 2. Rehydrate the aggregate
//!   ↓
//! 3. Handle the command (pure decision, produces events)
//!   ↓
//! 4. Stage the events with an exact expected version
//! ```
//!
//! Nothing reaches the store until the unit of work commits, and publication
//! happens only after that (see `Shopkeeper::commit`).

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use shopkeeper_core::{Aggregate, AggregateId, CompanyId, DomainError, ExpectedVersion};
use shopkeeper_events::Event;

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent, UnitOfWork};
use crate::streams::Streamed;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale stream version or duplicate create).
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// A loaded stream mixes companies or aggregates.
    #[error("company isolation violation: {0}")]
    CompanyIsolation(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Lifecycle transition refused by the aggregate.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    /// History could not be deserialized into the aggregate's event type.
    #[error("failed to deserialize event history: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::CompanyIsolation(msg) => DispatchError::CompanyIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::InvalidTransition(msg) => DispatchError::InvalidTransition(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Load and drive aggregates inside a transaction boundary.
pub trait CommandDispatcher {
    /// Rehydrate an aggregate. Unknown streams give the empty aggregate.
    fn load<A>(&self, company_id: CompanyId, id: A::Id) -> Result<A, DispatchError>
    where
        A: Streamed,
        A::Event: DeserializeOwned;

    /// Run `command` against the aggregate and stage the decided events.
    ///
    /// Returns the aggregate with those events applied.
    fn dispatch<A>(&mut self, company_id: CompanyId, id: A::Id, command: A::Command) -> Result<A, DispatchError>
    where
        A: Streamed,
        A::Event: Event + Serialize + DeserializeOwned;
}

impl<S: EventStore + ?Sized> CommandDispatcher for UnitOfWork<'_, S> {
    fn load<A>(&self, company_id: CompanyId, id: A::Id) -> Result<A, DispatchError>
    where
        A: Streamed,
        A::Event: DeserializeOwned,
    {
        let aggregate_id = A::stream_id(&id);
        let history = self.load_stream(company_id, aggregate_id)?;
        validate_loaded_stream(company_id, aggregate_id, &history)?;

        let mut aggregate = A::empty_for(id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    fn dispatch<A>(&mut self, company_id: CompanyId, id: A::Id, command: A::Command) -> Result<A, DispatchError>
    where
        A: Streamed,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let aggregate_id = A::stream_id(&id);

        // 1) Load history (company-scoped, staged events included)
        let history = self.load_stream(company_id, aggregate_id)?;
        validate_loaded_stream(company_id, aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate
        let mut aggregate = A::empty_for(id);
        apply_history(&mut aggregate, &history)?;

        // 3) Decide (no mutation)
        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(aggregate);
        }

        // 4) Stage
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(company_id, aggregate_id, A::AGGREGATE_TYPE, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;
        self.stage(company_id, aggregate_id, expected, uncommitted)?;

        for ev in &decided {
            aggregate.apply(ev);
        }
        Ok(aggregate)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    company_id: CompanyId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // A buggy backend must not leak another company's history.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.company_id != company_id {
            return Err(DispatchError::CompanyIsolation(format!(
                "loaded stream contains wrong company_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::CompanyIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shopkeeper_core::AggregateRoot;
    use shopkeeper_parties::{Party, PartyCommand, PartyId, PartyKind, RegisterParty};

    use crate::event_store::InMemoryEventStore;

    fn register(scope: CompanyId, party_id: PartyId, name: &str) -> PartyCommand {
        PartyCommand::RegisterParty(RegisterParty {
            scope,
            party_id,
            kind: PartyKind::Supplier,
            name: name.to_string(),
            email: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_stages_and_later_loads_see_it() {
        let store = InMemoryEventStore::new();
        let company_id = CompanyId::new();
        let party_id = PartyId::new(AggregateId::new());

        let mut uow = UnitOfWork::begin(&store);
        let party: Party = uow.dispatch(company_id, party_id, register(company_id, party_id, "Acme")).unwrap();
        assert_eq!(party.version(), 1);

        // The staged registration is visible to the next command on the stream.
        let err = uow
            .dispatch::<Party>(company_id, party_id, register(company_id, party_id, "Acme"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));

        let owner_id = PartyId::new(AggregateId::new());
        let owner: Party = uow
            .dispatch(
                company_id,
                owner_id,
                PartyCommand::RegisterParty(RegisterParty {
                    scope: company_id,
                    party_id: owner_id,
                    kind: PartyKind::Company,
                    name: "Corner Store".to_string(),
                    email: Some("owner@corner.example".to_string()),
                    occurred_at: Utc::now(),
                }),
            )
            .unwrap();
        assert_eq!(owner.kind(), PartyKind::Company);
        assert!(store.load_all().unwrap().is_empty());

        uow.commit().unwrap();
        let reloaded: Party = UnitOfWork::begin(&store).load(company_id, party_id).unwrap();
        assert_eq!(reloaded.version(), 1);
        assert_eq!(reloaded.name(), "Acme");
        let reloaded_owner: Party = UnitOfWork::begin(&store).load(company_id, owner_id).unwrap();
        assert_eq!(reloaded_owner.email(), Some("owner@corner.example"));
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn domain_errors_are_mapped_and_nothing_is_staged() {
        let store = InMemoryEventStore::new();
        let company_id = CompanyId::new();
        let party_id = PartyId::new(AggregateId::new());

        let mut uow = UnitOfWork::begin(&store);
        let err = uow
            .dispatch::<Party>(company_id, party_id, register(company_id, party_id, "  "))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(uow.is_empty());
    }

    #[test]
    fn loading_in_another_company_sees_nothing() {
        let store = InMemoryEventStore::new();
        let company_id = CompanyId::new();
        let party_id = PartyId::new(AggregateId::new());

        let mut uow = UnitOfWork::begin(&store);
        uow.dispatch::<Party>(company_id, party_id, register(company_id, party_id, "Acme")).unwrap();
        uow.commit().unwrap();

        let other: Party = UnitOfWork::begin(&store).load(CompanyId::new(), party_id).unwrap();
        assert!(!other.is_created());
    }
}
