//! Pieces shared by inbound and outbound shipments.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopkeeper_core::{AggregateId, DomainError};
use shopkeeper_products::ProductId;

use crate::location::LocationId;
use crate::stock_move::{MoveState, StockMove, StockMoveId};

/// Shipment identifier (inbound and outbound shipments use separate streams).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub AggregateId);

impl ShipmentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The three zones of the warehouse a shipment passes through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseZones {
    pub input: LocationId,
    pub storage: LocationId,
    pub output: LocationId,
}

/// Quantity of a product currently on hand in the warehouse storage zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAvailability {
    pub product_id: ProductId,
    pub quantity: Decimal,
}

/// Checks the moves a shipment is created with. An empty batch is allowed and
/// walks through every state like any other.
pub(crate) fn validate_new_moves(
    moves: &[StockMove],
    expect: impl Fn(&StockMove) -> Result<(), DomainError>,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for m in moves {
        if !seen.insert(m.id) {
            return Err(DomainError::validation(format!("duplicate stock move {}", m.id)));
        }
        if m.state != MoveState::Draft {
            return Err(DomainError::validation(format!(
                "stock move {} must be a draft",
                m.id
            )));
        }
        expect(m)?;
    }
    Ok(())
}

/// Derive one follow-on move per source move, using the caller-supplied ids.
pub(crate) fn derive_moves(
    sources: &[StockMove],
    ids: &[StockMoveId],
    from: LocationId,
    to: LocationId,
) -> Result<Vec<StockMove>, DomainError> {
    if ids.len() != sources.len() {
        return Err(DomainError::validation(format!(
            "expected {} move ids, got {}",
            sources.len(),
            ids.len()
        )));
    }
    let taken: HashSet<StockMoveId> = sources.iter().map(|m| m.id).collect();
    let mut fresh = HashSet::new();
    for id in ids {
        if taken.contains(id) || !fresh.insert(*id) {
            return Err(DomainError::validation(format!("stock move id {id} is not unique")));
        }
    }
    Ok(sources
        .iter()
        .zip(ids)
        .map(|(m, id)| m.follow_on(*id, from, to))
        .collect())
}

/// Total quantity per product over a set of moves.
pub(crate) fn required_by_product(
    moves: &[StockMove],
) -> Result<BTreeMap<ProductId, Decimal>, DomainError> {
    let mut out = BTreeMap::new();
    for m in moves {
        let total = out.entry(m.product_id).or_insert(Decimal::ZERO);
        *total = total.checked_add(m.quantity.value()).ok_or_else(|| {
            DomainError::validation(format!("required quantity of product {} overflows", m.product_id))
        })?;
    }
    Ok(out)
}

pub(crate) fn set_state(moves: &[StockMove], state: MoveState) -> Vec<StockMove> {
    moves.iter().map(|m| m.with_state(state)).collect()
}
