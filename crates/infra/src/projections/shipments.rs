use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use shopkeeper_core::CompanyId;
use shopkeeper_events::EventEnvelope;
use shopkeeper_parties::PartyId;
use shopkeeper_stock::{ShipmentId, ShipmentInEvent, ShipmentOutEvent, StockMove};

use super::{ProjectionError, StreamCursors, check_company};
use crate::read_model::{CompanyStore, InMemoryCompanyStore};
use crate::streams::aggregate_types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentDirection {
    Inbound,
    Outbound,
}

/// One row of the shipments listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentSummary {
    pub shipment_id: ShipmentId,
    pub direction: ShipmentDirection,
    pub party: PartyId,
    pub state: String,
    pub move_count: usize,
    /// Total of quantity × unit price over the external moves.
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn moves_value(shipment_id: ShipmentId, moves: &[StockMove]) -> Result<Decimal, ProjectionError> {
    moves
        .iter()
        .try_fold(Decimal::ZERO, |total, m| {
            m.quantity
                .value()
                .checked_mul(m.unit_price.value())
                .and_then(|amount| total.checked_add(amount))
        })
        .ok_or_else(|| ProjectionError::Overflow(format!("value of shipment {shipment_id}")))
}

#[derive(Debug)]
pub struct ShipmentsProjection<S = InMemoryCompanyStore<ShipmentId, ShipmentSummary>>
where
    S: CompanyStore<ShipmentId, ShipmentSummary>,
{
    store: S,
    cursors: StreamCursors,
}

impl Default for ShipmentsProjection {
    fn default() -> Self {
        Self::new(InMemoryCompanyStore::new())
    }
}

impl<S> ShipmentsProjection<S>
where
    S: CompanyStore<ShipmentId, ShipmentSummary>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, company_id: CompanyId, shipment_id: ShipmentId) -> Option<ShipmentSummary> {
        self.store.get(company_id, &shipment_id)
    }

    /// Oldest first.
    pub fn list(&self, company_id: CompanyId) -> Vec<ShipmentSummary> {
        let mut rows = self.store.list(company_id);
        rows.sort_by_key(|r| (r.created_at, *r.shipment_id.0.as_uuid()));
        rows
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let company_id = envelope.company_id();
        match envelope.aggregate_type() {
            aggregate_types::SHIPMENT_IN => {
                if !self.cursors.accept(envelope)? {
                    return Ok(());
                }
                let ev: ShipmentInEvent = serde_json::from_value(envelope.payload().clone())
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
                check_company(envelope, ev.company_id())?;
                match ev {
                    ShipmentInEvent::Created(e) => self.store.upsert(
                        company_id,
                        e.shipment_id,
                        ShipmentSummary {
                            shipment_id: e.shipment_id,
                            direction: ShipmentDirection::Inbound,
                            party: e.supplier,
                            state: "draft".to_string(),
                            move_count: e.incoming_moves.len(),
                            value: moves_value(e.shipment_id, &e.incoming_moves)?,
                            created_at: e.occurred_at,
                            updated_at: e.occurred_at,
                        },
                    ),
                    ShipmentInEvent::Received(e) => {
                        self.transition(company_id, e.shipment_id, "received", e.occurred_at)?
                    }
                    ShipmentInEvent::Done(e) => self.transition(company_id, e.shipment_id, "done", e.occurred_at)?,
                }
            }
            aggregate_types::SHIPMENT_OUT => {
                if !self.cursors.accept(envelope)? {
                    return Ok(());
                }
                let ev: ShipmentOutEvent = serde_json::from_value(envelope.payload().clone())
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
                check_company(envelope, ev.company_id())?;
                match ev {
                    ShipmentOutEvent::Created(e) => self.store.upsert(
                        company_id,
                        e.shipment_id,
                        ShipmentSummary {
                            shipment_id: e.shipment_id,
                            direction: ShipmentDirection::Outbound,
                            party: e.customer,
                            state: "draft".to_string(),
                            move_count: e.outgoing_moves.len(),
                            value: moves_value(e.shipment_id, &e.outgoing_moves)?,
                            created_at: e.occurred_at,
                            updated_at: e.occurred_at,
                        },
                    ),
                    ShipmentOutEvent::Waiting(e) => {
                        self.transition(company_id, e.shipment_id, "waiting", e.occurred_at)?
                    }
                    ShipmentOutEvent::Assigned(e) => {
                        self.transition(company_id, e.shipment_id, "assigned", e.occurred_at)?
                    }
                    ShipmentOutEvent::Packed(e) => self.transition(company_id, e.shipment_id, "packed", e.occurred_at)?,
                    ShipmentOutEvent::Done(e) => self.transition(company_id, e.shipment_id, "done", e.occurred_at)?,
                }
            }
            _ => return Ok(()),
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }

    fn transition(
        &self,
        company_id: CompanyId,
        shipment_id: ShipmentId,
        state: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ProjectionError> {
        let mut row = self
            .store
            .get(company_id, &shipment_id)
            .ok_or_else(|| ProjectionError::MissingRecord(format!("shipment {shipment_id}")))?;
        row.state = state.to_string();
        row.updated_at = at;
        self.store.upsert(company_id, shipment_id, row);
        Ok(())
    }
}
