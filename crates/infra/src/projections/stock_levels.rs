use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use shopkeeper_core::CompanyId;
use shopkeeper_events::EventEnvelope;
use shopkeeper_products::ProductId;
use shopkeeper_stock::{LocationId, ShipmentInEvent, ShipmentOutEvent, StockMove};

use super::{ProjectionError, StreamCursors, check_company};
use crate::read_model::{CompanyStore, InMemoryCompanyStore};
use crate::streams::aggregate_types;

/// Committed on-hand quantity of one product at one location.
///
/// Virtual locations (supplier, customer) go negative as goods leave them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub location_id: LocationId,
    pub product_id: ProductId,
    pub quantity: Decimal,
}

/// Stock levels projection: applies the moves each shipment event completes.
#[derive(Debug)]
pub struct StockLevelsProjection<S = InMemoryCompanyStore<(LocationId, ProductId), StockLevel>>
where
    S: CompanyStore<(LocationId, ProductId), StockLevel>,
{
    store: S,
    cursors: StreamCursors,
}

impl Default for StockLevelsProjection {
    fn default() -> Self {
        Self::new(InMemoryCompanyStore::new())
    }
}

impl<S> StockLevelsProjection<S>
where
    S: CompanyStore<(LocationId, ProductId), StockLevel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn on_hand(&self, company_id: CompanyId, location_id: LocationId, product_id: ProductId) -> Decimal {
        self.store
            .get(company_id, &(location_id, product_id))
            .map(|l| l.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn list(&self, company_id: CompanyId) -> Vec<StockLevel> {
        self.store.list(company_id)
    }

    pub fn at_location(&self, company_id: CompanyId, location_id: LocationId) -> Vec<StockLevel> {
        self.store
            .list(company_id)
            .into_iter()
            .filter(|l| l.location_id == location_id)
            .collect()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let moves: Vec<StockMove> = match envelope.aggregate_type() {
            aggregate_types::SHIPMENT_IN => {
                if !self.cursors.accept(envelope)? {
                    return Ok(());
                }
                let ev: ShipmentInEvent = serde_json::from_value(envelope.payload().clone())
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
                check_company(envelope, ev.company_id())?;
                ev.completed_moves().to_vec()
            }
            aggregate_types::SHIPMENT_OUT => {
                if !self.cursors.accept(envelope)? {
                    return Ok(());
                }
                let ev: ShipmentOutEvent = serde_json::from_value(envelope.payload().clone())
                    .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
                check_company(envelope, ev.company_id())?;
                ev.completed_moves().to_vec()
            }
            _ => return Ok(()),
        };

        let company_id = envelope.company_id();
        // Levels are staged so an overflow leaves every level untouched.
        let mut staged: Vec<StockLevel> = Vec::new();
        for m in &moves {
            for (location_id, product_id, delta) in m.deltas() {
                let idx = match staged
                    .iter()
                    .position(|l| l.location_id == location_id && l.product_id == product_id)
                {
                    Some(idx) => idx,
                    None => {
                        staged.push(
                            self.store
                                .get(company_id, &(location_id, product_id))
                                .unwrap_or(StockLevel {
                                    location_id,
                                    product_id,
                                    quantity: Decimal::ZERO,
                                }),
                        );
                        staged.len() - 1
                    }
                };
                let level = &mut staged[idx];
                level.quantity = level.quantity.checked_add(delta).ok_or_else(|| {
                    ProjectionError::Overflow(format!(
                        "quantity of product {product_id} at location {location_id}"
                    ))
                })?;
            }
        }
        for level in staged {
            self.store.upsert(company_id, (level.location_id, level.product_id), level);
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shopkeeper_core::{AggregateId, Quantity, UnitPrice};
    use shopkeeper_products::Uom;
    use shopkeeper_stock::{ShipmentId, ShipmentInDone, StockMoveId};
    use uuid::Uuid;

    fn done(company_id: CompanyId, product_id: ProductId, from: LocationId, to: LocationId) -> EventEnvelope<JsonValue> {
        let shipment_id = ShipmentId::new(AggregateId::new());
        let moved = StockMove::draft(
            StockMoveId::generate(),
            product_id,
            Uom::Unit,
            Quantity::new(Decimal::MAX).unwrap(),
            UnitPrice::new(Decimal::ONE).unwrap(),
            from,
            to,
        )
        .unwrap();
        let event = ShipmentInEvent::Done(ShipmentInDone {
            company_id,
            shipment_id,
            inventory_moves: vec![moved],
            occurred_at: Utc::now(),
        });
        EventEnvelope::new(
            Uuid::now_v7(),
            company_id,
            shipment_id.0,
            aggregate_types::SHIPMENT_IN,
            3,
            "stock.shipment_in.done",
            serde_json::to_value(event).unwrap(),
        )
    }

    #[test]
    fn overflowing_quantity_is_rejected_without_partial_update() {
        let projection = StockLevelsProjection::default();
        let company_id = CompanyId::new();
        let product_id = ProductId::new(AggregateId::new());
        let input = LocationId::new(AggregateId::new());
        let first_supplier = LocationId::new(AggregateId::new());
        let second_supplier = LocationId::new(AggregateId::new());

        projection
            .apply_envelope(&done(company_id, product_id, first_supplier, input))
            .unwrap();
        let err = projection
            .apply_envelope(&done(company_id, product_id, second_supplier, input))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::Overflow(_)));

        assert_eq!(projection.on_hand(company_id, input, product_id), Decimal::MAX);
        assert_eq!(projection.on_hand(company_id, second_supplier, product_id), Decimal::ZERO);
    }
}
