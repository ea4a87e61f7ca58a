//! Outbound (customer) shipment.
//!
//! Lifecycle: `draft -> waiting -> assigned -> packed -> done`.
//!
//! - **wait**: one inventory move (storage zone -> output zone) is derived per
//!   outgoing move.
//! - **assign**: reserves the inventory moves against what storage has on hand.
//!   Fails with [`DomainError::InvalidTransition`] when stock is short.
//! - **pack**: the inventory moves are done; outgoing moves become assigned.
//! - **done**: the outgoing moves (output zone -> customer) are done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateRoot, CompanyId, DomainError, checked_sum};
use shopkeeper_events::Event;
use shopkeeper_parties::PartyId;

use crate::shipment::{
    ShipmentId, StockAvailability, WarehouseZones, derive_moves, required_by_product, set_state,
    validate_new_moves,
};
use crate::stock_move::{MoveState, StockMove, StockMoveId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentOutState {
    Draft,
    Waiting,
    Assigned,
    Packed,
    Done,
}

/// Aggregate root: outbound shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentOut {
    id: ShipmentId,
    company_id: Option<CompanyId>,
    customer: Option<PartyId>,
    warehouse: Option<WarehouseZones>,
    outgoing_moves: Vec<StockMove>,
    inventory_moves: Vec<StockMove>,
    state: ShipmentOutState,
    version: u64,
    created: bool,
}

impl ShipmentOut {
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            company_id: None,
            customer: None,
            warehouse: None,
            outgoing_moves: Vec::new(),
            inventory_moves: Vec::new(),
            state: ShipmentOutState::Draft,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn customer(&self) -> Option<PartyId> {
        self.customer
    }

    pub fn state(&self) -> ShipmentOutState {
        self.state
    }

    pub fn outgoing_moves(&self) -> &[StockMove] {
        &self.outgoing_moves
    }

    pub fn inventory_moves(&self) -> &[StockMove] {
        &self.inventory_moves
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ShipmentOut {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShipmentOut {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub customer: PartyId,
    pub warehouse: WarehouseZones,
    pub outgoing_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitShipmentOut {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_move_ids: Vec<StockMoveId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignShipmentOut.
///
/// `available` is the on-hand quantity in the storage zone for each product,
/// read from the stock levels projection by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignShipmentOut {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub available: Vec<StockAvailability>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackShipmentOut {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteShipmentOut {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentOutCommand {
    Create(CreateShipmentOut),
    Wait(WaitShipmentOut),
    Assign(AssignShipmentOut),
    Pack(PackShipmentOut),
    Complete(CompleteShipmentOut),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutCreated {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub customer: PartyId,
    pub warehouse: WarehouseZones,
    pub outgoing_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutWaiting {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutAssigned {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutPacked {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_moves: Vec<StockMove>,
    pub outgoing_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOutDone {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub outgoing_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentOutEvent {
    Created(ShipmentOutCreated),
    Waiting(ShipmentOutWaiting),
    Assigned(ShipmentOutAssigned),
    Packed(ShipmentOutPacked),
    Done(ShipmentOutDone),
}

impl ShipmentOutEvent {
    /// Moves that became done with this event (drives on-hand quantities).
    pub fn completed_moves(&self) -> &[StockMove] {
        match self {
            ShipmentOutEvent::Packed(e) => &e.inventory_moves,
            ShipmentOutEvent::Done(e) => &e.outgoing_moves,
            _ => &[],
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            ShipmentOutEvent::Created(e) => e.company_id,
            ShipmentOutEvent::Waiting(e) => e.company_id,
            ShipmentOutEvent::Assigned(e) => e.company_id,
            ShipmentOutEvent::Packed(e) => e.company_id,
            ShipmentOutEvent::Done(e) => e.company_id,
        }
    }
}

impl Event for ShipmentOutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentOutEvent::Created(_) => "stock.shipment_out.created",
            ShipmentOutEvent::Waiting(_) => "stock.shipment_out.waiting",
            ShipmentOutEvent::Assigned(_) => "stock.shipment_out.assigned",
            ShipmentOutEvent::Packed(_) => "stock.shipment_out.packed",
            ShipmentOutEvent::Done(_) => "stock.shipment_out.done",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentOutEvent::Created(e) => e.occurred_at,
            ShipmentOutEvent::Waiting(e) => e.occurred_at,
            ShipmentOutEvent::Assigned(e) => e.occurred_at,
            ShipmentOutEvent::Packed(e) => e.occurred_at,
            ShipmentOutEvent::Done(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ShipmentOut {
    type Command = ShipmentOutCommand;
    type Event = ShipmentOutEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentOutEvent::Created(e) => {
                self.id = e.shipment_id;
                self.company_id = Some(e.company_id);
                self.customer = Some(e.customer);
                self.warehouse = Some(e.warehouse);
                self.outgoing_moves = e.outgoing_moves.clone();
                self.state = ShipmentOutState::Draft;
                self.created = true;
            }
            ShipmentOutEvent::Waiting(e) => {
                self.inventory_moves = e.inventory_moves.clone();
                self.state = ShipmentOutState::Waiting;
            }
            ShipmentOutEvent::Assigned(e) => {
                self.inventory_moves = e.inventory_moves.clone();
                self.state = ShipmentOutState::Assigned;
            }
            ShipmentOutEvent::Packed(e) => {
                self.inventory_moves = e.inventory_moves.clone();
                self.outgoing_moves = e.outgoing_moves.clone();
                self.state = ShipmentOutState::Packed;
            }
            ShipmentOutEvent::Done(e) => {
                self.outgoing_moves = e.outgoing_moves.clone();
                self.state = ShipmentOutState::Done;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentOutCommand::Create(cmd) => self.handle_create(cmd),
            ShipmentOutCommand::Wait(cmd) => self.handle_wait(cmd),
            ShipmentOutCommand::Assign(cmd) => self.handle_assign(cmd),
            ShipmentOutCommand::Pack(cmd) => self.handle_pack(cmd),
            ShipmentOutCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl ShipmentOut {
    fn ensure_state(
        &self,
        company_id: CompanyId,
        expected: ShipmentOutState,
        action: &str,
    ) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.state != expected {
            return Err(DomainError::transition(format!(
                "cannot {action} a shipment in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateShipmentOut) -> Result<Vec<ShipmentOutEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("shipment already exists"));
        }
        validate_new_moves(&cmd.outgoing_moves, |m| {
            if m.from_location != cmd.warehouse.output {
                return Err(DomainError::validation(format!(
                    "outgoing move {} must start in the warehouse output zone",
                    m.id
                )));
            }
            Ok(())
        })?;

        Ok(vec![ShipmentOutEvent::Created(ShipmentOutCreated {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            customer: cmd.customer,
            warehouse: cmd.warehouse,
            outgoing_moves: cmd.outgoing_moves.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_wait(&self, cmd: &WaitShipmentOut) -> Result<Vec<ShipmentOutEvent>, DomainError> {
        self.ensure_state(cmd.company_id, ShipmentOutState::Draft, "wait")?;
        let warehouse = self
            .warehouse
            .ok_or_else(|| DomainError::invariant("shipment has no warehouse"))?;

        let inventory_moves = derive_moves(
            &self.outgoing_moves,
            &cmd.inventory_move_ids,
            warehouse.storage,
            warehouse.output,
        )?;

        Ok(vec![ShipmentOutEvent::Waiting(ShipmentOutWaiting {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            inventory_moves,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignShipmentOut) -> Result<Vec<ShipmentOutEvent>, DomainError> {
        self.ensure_state(cmd.company_id, ShipmentOutState::Waiting, "assign")?;

        for (product_id, required) in required_by_product(&self.inventory_moves)? {
            let available = checked_sum(
                cmd.available
                    .iter()
                    .filter(|a| a.product_id == product_id)
                    .map(|a| a.quantity),
            )
            .ok_or_else(|| {
                DomainError::validation(format!("available quantity of product {product_id} overflows"))
            })?;
            if available < required {
                return Err(DomainError::transition(format!(
                    "insufficient stock for product {product_id}: required {required}, available {available}"
                )));
            }
        }

        Ok(vec![ShipmentOutEvent::Assigned(ShipmentOutAssigned {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            inventory_moves: set_state(&self.inventory_moves, MoveState::Assigned),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pack(&self, cmd: &PackShipmentOut) -> Result<Vec<ShipmentOutEvent>, DomainError> {
        self.ensure_state(cmd.company_id, ShipmentOutState::Assigned, "pack")?;

        Ok(vec![ShipmentOutEvent::Packed(ShipmentOutPacked {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            inventory_moves: set_state(&self.inventory_moves, MoveState::Done),
            outgoing_moves: set_state(&self.outgoing_moves, MoveState::Assigned),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteShipmentOut) -> Result<Vec<ShipmentOutEvent>, DomainError> {
        self.ensure_state(cmd.company_id, ShipmentOutState::Packed, "complete")?;

        Ok(vec![ShipmentOutEvent::Done(ShipmentOutDone {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            outgoing_moves: set_state(&self.outgoing_moves, MoveState::Done),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use shopkeeper_core::aggregate::execute;
    use shopkeeper_core::{AggregateId, Quantity, UnitPrice};
    use shopkeeper_products::{ProductId, Uom};

    use crate::location::LocationId;

    fn loc() -> LocationId {
        LocationId::new(AggregateId::new())
    }

    struct Fixture {
        company_id: CompanyId,
        product_id: ProductId,
        zones: WarehouseZones,
        shipment: ShipmentOut,
    }

    fn waiting(quantity: Decimal) -> Fixture {
        let company_id = CompanyId::new();
        let product_id = ProductId::new(AggregateId::new());
        let zones = WarehouseZones {
            input: loc(),
            storage: loc(),
            output: loc(),
        };
        let id = ShipmentId::new(AggregateId::new());
        let mut shipment = ShipmentOut::empty(id);
        let outgoing = StockMove::draft(
            StockMoveId::generate(),
            product_id,
            Uom::Unit,
            Quantity::new(quantity).unwrap(),
            UnitPrice::new(dec!(25)).unwrap(),
            zones.output,
            loc(),
        )
        .unwrap();

        execute(
            &mut shipment,
            &ShipmentOutCommand::Create(CreateShipmentOut {
                company_id,
                shipment_id: id,
                customer: PartyId::new(AggregateId::new()),
                warehouse: zones,
                outgoing_moves: vec![outgoing],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        execute(
            &mut shipment,
            &ShipmentOutCommand::Wait(WaitShipmentOut {
                company_id,
                shipment_id: id,
                inventory_move_ids: vec![StockMoveId::generate()],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        Fixture {
            company_id,
            product_id,
            zones,
            shipment,
        }
    }

    fn assign(f: &Fixture, on_hand: Decimal) -> ShipmentOutCommand {
        ShipmentOutCommand::Assign(AssignShipmentOut {
            company_id: f.company_id,
            shipment_id: *f.shipment.id(),
            available: vec![StockAvailability {
                product_id: f.product_id,
                quantity: on_hand,
            }],
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn full_lifecycle_reaches_done() {
        let mut f = waiting(dec!(2));
        let inv = &f.shipment.inventory_moves()[0];
        assert_eq!(inv.from_location, f.zones.storage);
        assert_eq!(inv.to_location, f.zones.output);

        let cmd = assign(&f, dec!(5));
        execute(&mut f.shipment, &cmd).unwrap();
        assert_eq!(f.shipment.state(), ShipmentOutState::Assigned);

        let (company_id, shipment_id) = (f.company_id, *f.shipment.id());
        let packed = execute(
            &mut f.shipment,
            &ShipmentOutCommand::Pack(PackShipmentOut {
                company_id,
                shipment_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(packed[0].completed_moves().len(), 1);
        assert_eq!(f.shipment.outgoing_moves()[0].state, MoveState::Assigned);

        let done = execute(
            &mut f.shipment,
            &ShipmentOutCommand::Complete(CompleteShipmentOut {
                company_id,
                shipment_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(f.shipment.state(), ShipmentOutState::Done);
        assert_eq!(done[0].completed_moves()[0].state, MoveState::Done);
        assert_eq!(f.shipment.version(), 5);
    }

    #[test]
    fn assign_fails_when_stock_is_short() {
        let f = waiting(dec!(2));
        let err = f.shipment.handle(&assign(&f, dec!(1))).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(msg) if msg.contains("insufficient stock")));
    }

    #[test]
    fn assign_rejects_availability_that_overflows() {
        let f = waiting(dec!(2));
        let row = StockAvailability {
            product_id: f.product_id,
            quantity: Decimal::MAX,
        };
        let err = f
            .shipment
            .handle(&ShipmentOutCommand::Assign(AssignShipmentOut {
                company_id: f.company_id,
                shipment_id: *f.shipment.id(),
                available: vec![row.clone(), row],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("overflows")));
    }

    #[test]
    fn assign_fails_when_product_is_unknown_to_storage() {
        let f = waiting(dec!(1));
        let err = f
            .shipment
            .handle(&ShipmentOutCommand::Assign(AssignShipmentOut {
                company_id: f.company_id,
                shipment_id: *f.shipment.id(),
                available: Vec::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn cannot_pack_before_assignment() {
        let f = waiting(dec!(1));
        let err = f
            .shipment
            .handle(&ShipmentOutCommand::Pack(PackShipmentOut {
                company_id: f.company_id,
                shipment_id: *f.shipment.id(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    proptest! {
        #[test]
        fn assignment_succeeds_iff_stock_covers_demand(required in 1i64..500, on_hand in 0i64..500) {
            let f = waiting(Decimal::from(required));
            let result = f.shipment.handle(&assign(&f, Decimal::from(on_hand)));
            prop_assert_eq!(result.is_ok(), on_hand >= required);
        }
    }
}
