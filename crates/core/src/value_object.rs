//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two quantities of
/// `3` are the same quantity, whereas two parties named "Acme" are not the same party.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
