//! Product catalog domain module (event-sourced).
//!
//! Pure domain logic only: no IO, no HTTP, no storage.

pub mod product;
pub mod uom;

pub use product::{
    CreateProduct, Product, ProductCommand, ProductCreated, ProductEvent, ProductId, ProductKind,
};
pub use uom::Uom;
