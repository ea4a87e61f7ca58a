//! Parties domain module (companies' owners, customers and suppliers).
//!
//! Pure domain logic only: no IO, no HTTP, no storage.

pub mod party;

pub use party::{Party, PartyCommand, PartyEvent, PartyId, PartyKind, PartyRegistered, RegisterParty};
