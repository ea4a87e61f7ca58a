//! Infrastructure layer: event store, unit of work, read models and the
//! workflows that drive the domain aggregates.

pub mod command_dispatcher;
pub mod config;
pub mod error;
pub mod event_store;
pub mod lookup;
pub mod projections;
pub mod read_model;
pub mod session;
pub mod shopkeeper;
pub mod streams;
pub mod workflows;

pub use config::{ConfigError, ReferenceNames, ShopkeeperConfig};
pub use error::ServiceError;
pub use session::Session;
pub use shopkeeper::{Envelope, Shopkeeper};

#[cfg(test)]
mod integration_tests;
