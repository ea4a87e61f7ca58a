//! Append-only event store boundary.
//!
//! Company-scoped event streams, an in-memory backend and the unit of work
//! that makes a multi-aggregate call all-or-nothing.

pub mod in_memory;
pub mod r#trait;
pub mod unit_of_work;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
pub use unit_of_work::UnitOfWork;
