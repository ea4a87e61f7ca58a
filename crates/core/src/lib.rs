//! `shopkeeper-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CompanyId, UserId};
pub use money::{Quantity, UnitPrice, checked_sum, extend_amount, round_to_digits};
pub use value_object::ValueObject;
