//! Stock domain module: locations, stock moves and shipments (event-sourced).
//!
//! Inbound shipments bring goods from a supplier into the warehouse input zone
//! and on into storage; outbound shipments pull goods from storage to the output
//! zone and out to a customer. Every transition is a pure aggregate decision.

pub mod location;
pub mod shipment;
pub mod shipment_in;
pub mod shipment_out;
pub mod stock_move;

pub use location::{
    CreateLocation, Location, LocationCommand, LocationCreated, LocationEvent, LocationId,
    LocationKind,
};
pub use shipment::{ShipmentId, StockAvailability, WarehouseZones};
pub use shipment_in::{
    CompleteShipmentIn, CreateShipmentIn, ReceiveShipmentIn, ShipmentIn, ShipmentInCommand,
    ShipmentInCreated, ShipmentInDone, ShipmentInEvent, ShipmentInReceived, ShipmentInState,
};
pub use shipment_out::{
    AssignShipmentOut, CompleteShipmentOut, CreateShipmentOut, PackShipmentOut, ShipmentOut,
    ShipmentOutAssigned, ShipmentOutCommand, ShipmentOutCreated, ShipmentOutDone,
    ShipmentOutEvent, ShipmentOutPacked, ShipmentOutState, ShipmentOutWaiting, WaitShipmentOut,
};
pub use stock_move::{MoveState, StockMove, StockMoveId};
