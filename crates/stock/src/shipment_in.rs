//! Inbound (supplier) shipment.
//!
//! Lifecycle: `draft -> received -> done`.
//!
//! - **receive**: the incoming moves (supplier -> input zone) are done, and one
//!   inventory move (input zone -> storage zone) is derived per incoming move.
//! - **done**: the inventory moves are done, so goods are on hand in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;
use shopkeeper_parties::PartyId;

use crate::shipment::{ShipmentId, WarehouseZones, derive_moves, set_state, validate_new_moves};
use crate::stock_move::{MoveState, StockMove, StockMoveId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentInState {
    Draft,
    Received,
    Done,
}

/// Aggregate root: inbound shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentIn {
    id: ShipmentId,
    company_id: Option<CompanyId>,
    supplier: Option<PartyId>,
    warehouse: Option<WarehouseZones>,
    incoming_moves: Vec<StockMove>,
    inventory_moves: Vec<StockMove>,
    state: ShipmentInState,
    version: u64,
    created: bool,
}

impl ShipmentIn {
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            company_id: None,
            supplier: None,
            warehouse: None,
            incoming_moves: Vec::new(),
            inventory_moves: Vec::new(),
            state: ShipmentInState::Draft,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn supplier(&self) -> Option<PartyId> {
        self.supplier
    }

    pub fn state(&self) -> ShipmentInState {
        self.state
    }

    pub fn incoming_moves(&self) -> &[StockMove] {
        &self.incoming_moves
    }

    pub fn inventory_moves(&self) -> &[StockMove] {
        &self.inventory_moves
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ShipmentIn {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateShipmentIn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShipmentIn {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub supplier: PartyId,
    pub warehouse: WarehouseZones,
    pub incoming_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveShipmentIn.
///
/// `inventory_move_ids` are assigned positionally to the derived inventory moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveShipmentIn {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_move_ids: Vec<StockMoveId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteShipmentIn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteShipmentIn {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentInCommand {
    Create(CreateShipmentIn),
    Receive(ReceiveShipmentIn),
    Complete(CompleteShipmentIn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInCreated {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub supplier: PartyId,
    pub warehouse: WarehouseZones,
    pub incoming_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

/// Incoming moves are done; inventory moves are created as drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInReceived {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub incoming_moves: Vec<StockMove>,
    pub inventory_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

/// Inventory moves are done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInDone {
    pub company_id: CompanyId,
    pub shipment_id: ShipmentId,
    pub inventory_moves: Vec<StockMove>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentInEvent {
    Created(ShipmentInCreated),
    Received(ShipmentInReceived),
    Done(ShipmentInDone),
}

impl ShipmentInEvent {
    /// Moves that became done with this event (drives on-hand quantities).
    pub fn completed_moves(&self) -> &[StockMove] {
        match self {
            ShipmentInEvent::Created(_) => &[],
            ShipmentInEvent::Received(e) => &e.incoming_moves,
            ShipmentInEvent::Done(e) => &e.inventory_moves,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            ShipmentInEvent::Created(e) => e.company_id,
            ShipmentInEvent::Received(e) => e.company_id,
            ShipmentInEvent::Done(e) => e.company_id,
        }
    }
}

impl Event for ShipmentInEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentInEvent::Created(_) => "stock.shipment_in.created",
            ShipmentInEvent::Received(_) => "stock.shipment_in.received",
            ShipmentInEvent::Done(_) => "stock.shipment_in.done",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentInEvent::Created(e) => e.occurred_at,
            ShipmentInEvent::Received(e) => e.occurred_at,
            ShipmentInEvent::Done(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ShipmentIn {
    type Command = ShipmentInCommand;
    type Event = ShipmentInEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentInEvent::Created(e) => {
                self.id = e.shipment_id;
                self.company_id = Some(e.company_id);
                self.supplier = Some(e.supplier);
                self.warehouse = Some(e.warehouse);
                self.incoming_moves = e.incoming_moves.clone();
                self.state = ShipmentInState::Draft;
                self.created = true;
            }
            ShipmentInEvent::Received(e) => {
                self.incoming_moves = e.incoming_moves.clone();
                self.inventory_moves = e.inventory_moves.clone();
                self.state = ShipmentInState::Received;
            }
            ShipmentInEvent::Done(e) => {
                self.inventory_moves = e.inventory_moves.clone();
                self.state = ShipmentInState::Done;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ShipmentInCommand::Create(cmd) => self.handle_create(cmd),
            ShipmentInCommand::Receive(cmd) => self.handle_receive(cmd),
            ShipmentInCommand::Complete(cmd) => self.handle_complete(cmd),
        }
    }
}

impl ShipmentIn {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateShipmentIn) -> Result<Vec<ShipmentInEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("shipment already exists"));
        }
        validate_new_moves(&cmd.incoming_moves, |m| {
            if m.to_location != cmd.warehouse.input {
                return Err(DomainError::validation(format!(
                    "incoming move {} must end in the warehouse input zone",
                    m.id
                )));
            }
            Ok(())
        })?;

        Ok(vec![ShipmentInEvent::Created(ShipmentInCreated {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            supplier: cmd.supplier,
            warehouse: cmd.warehouse,
            incoming_moves: cmd.incoming_moves.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveShipmentIn) -> Result<Vec<ShipmentInEvent>, DomainError> {
        self.ensure_company(cmd.company_id)?;
        if self.state != ShipmentInState::Draft {
            return Err(DomainError::transition(format!(
                "cannot receive a shipment in state {:?}",
                self.state
            )));
        }
        let warehouse = self
            .warehouse
            .ok_or_else(|| DomainError::invariant("shipment has no warehouse"))?;

        let inventory_moves = derive_moves(
            &self.incoming_moves,
            &cmd.inventory_move_ids,
            warehouse.input,
            warehouse.storage,
        )?;

        Ok(vec![ShipmentInEvent::Received(ShipmentInReceived {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            incoming_moves: set_state(&self.incoming_moves, MoveState::Done),
            inventory_moves,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteShipmentIn) -> Result<Vec<ShipmentInEvent>, DomainError> {
        self.ensure_company(cmd.company_id)?;
        if self.state != ShipmentInState::Received {
            return Err(DomainError::transition(format!(
                "cannot complete a shipment in state {:?}",
                self.state
            )));
        }

        Ok(vec![ShipmentInEvent::Done(ShipmentInDone {
            company_id: cmd.company_id,
            shipment_id: cmd.shipment_id,
            inventory_moves: set_state(&self.inventory_moves, MoveState::Done),
            occurred_at: cmd.occurred_at,
        })])
    }
}
