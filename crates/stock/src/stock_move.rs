use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopkeeper_core::{AggregateId, DomainError, Quantity, UnitPrice};
use shopkeeper_products::{ProductId, Uom};

use crate::location::LocationId;

/// Stock move identifier.
///
/// Stock moves are owned by the shipment that carries them; the id is what
/// account moves reference as their origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockMoveId(pub AggregateId);

impl StockMoveId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for StockMoveId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveState {
    Draft,
    Assigned,
    Done,
}

/// A quantity of one product travelling between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMove {
    pub id: StockMoveId,
    pub product_id: ProductId,
    pub uom: Uom,
    pub quantity: Quantity,
    pub unit_price: UnitPrice,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub state: MoveState,
}

impl StockMove {
    /// Build a draft move, checking that the quantity fits the unit of measure
    /// and that the move actually goes somewhere.
    pub fn draft(
        id: StockMoveId,
        product_id: ProductId,
        uom: Uom,
        quantity: Quantity,
        unit_price: UnitPrice,
        from_location: LocationId,
        to_location: LocationId,
    ) -> Result<Self, DomainError> {
        if from_location == to_location {
            return Err(DomainError::validation(
                "stock move source and destination must differ",
            ));
        }
        if !uom.accepts(quantity.value()) {
            return Err(DomainError::validation(format!(
                "quantity {quantity} has more than {} decimals for unit '{}'",
                uom.digits(),
                uom.symbol()
            )));
        }
        Ok(Self {
            id,
            product_id,
            uom,
            quantity,
            unit_price,
            from_location,
            to_location,
            state: MoveState::Draft,
        })
    }

    /// Same product and quantity, moved onwards between two other locations.
    pub fn follow_on(&self, id: StockMoveId, from: LocationId, to: LocationId) -> Self {
        Self {
            id,
            from_location: from,
            to_location: to,
            state: MoveState::Draft,
            ..self.clone()
        }
    }

    pub fn with_state(&self, state: MoveState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// On-hand deltas this move causes once done: `(location, product, delta)`.
    pub fn deltas(&self) -> [(LocationId, ProductId, Decimal); 2] {
        let q = self.quantity.value();
        [
            (self.from_location, self.product_id, -q),
            (self.to_location, self.product_id, q),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loc() -> LocationId {
        LocationId::new(AggregateId::new())
    }

    #[test]
    fn draft_move_rejects_same_location() {
        let here = loc();
        let err = StockMove::draft(
            StockMoveId::generate(),
            ProductId::new(AggregateId::new()),
            Uom::Unit,
            Quantity::new(dec!(1)).unwrap(),
            UnitPrice::new(dec!(1)).unwrap(),
            here,
            here,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn draft_move_rejects_fractional_units() {
        let err = StockMove::draft(
            StockMoveId::generate(),
            ProductId::new(AggregateId::new()),
            Uom::Unit,
            Quantity::new(dec!(1.5)).unwrap(),
            UnitPrice::new(dec!(1)).unwrap(),
            loc(),
            loc(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("decimals")));
    }

    #[test]
    fn deltas_conserve_quantity() {
        let (from, to) = (loc(), loc());
        let m = StockMove::draft(
            StockMoveId::generate(),
            ProductId::new(AggregateId::new()),
            Uom::Kilogram,
            Quantity::new(dec!(2.5)).unwrap(),
            UnitPrice::new(dec!(4)).unwrap(),
            from,
            to,
        )
        .unwrap();

        let [(l1, _, d1), (l2, _, d2)] = m.deltas();
        assert_eq!((l1, d1), (from, dec!(-2.5)));
        assert_eq!((l2, d2), (to, dec!(2.5)));
    }
}
