//! Commerce event posting: purchases and sales as shipments plus ledger moves.
//!
//! ```text
//! mark_bought: Supplier ──▶ Input Zone ──▶ Storage Zone     draft → received → done
//!              debit revenue / credit payable (supplier)
//!
//! mark_sold:   Storage Zone ──▶ Output Zone ──▶ Customer    draft → waiting → assigned → packed → done
//!              debit receivable (customer) / credit revenue
//! ```
//!
//! One account move per line item, with the stock move as origin. The shipment
//! reaches `done` before any account move is staged, and all account moves are
//! posted together at the end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, info_span, warn};

use shopkeeper_accounting::{
    AccountId, AccountMove, AccountMoveCommand, AccountMoveId, CreateAccountMove, FiscalYear,
    IssueNumber, JournalId, MoveLine, MoveOrigin, PostAccountMove, Sequence, SequenceCommand,
};
use shopkeeper_auth::Permission;
use shopkeeper_company::Company;
use shopkeeper_core::{AggregateId, CompanyId, Quantity, UnitPrice, extend_amount};
use shopkeeper_parties::PartyId;
use shopkeeper_products::{Product, ProductId, Uom};
use shopkeeper_stock::{
    AssignShipmentOut, CompleteShipmentIn, CompleteShipmentOut, CreateShipmentIn,
    CreateShipmentOut, LocationId, PackShipmentOut, ReceiveShipmentIn, ShipmentId, ShipmentIn,
    ShipmentInCommand, ShipmentOut, ShipmentOutCommand, StockAvailability, StockMove, StockMoveId,
    WaitShipmentOut, WarehouseZones,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::ReferenceNames;
use crate::error::ServiceError;
use crate::lookup::{LookupError, ReferenceLookup};
use crate::projections::{ReadModels, ReferenceKind};
use crate::session::Session;

/// One line of a commercial event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// What a posting call created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingReceipt {
    pub shipment_id: ShipmentId,
    pub account_moves: Vec<AccountMoveId>,
}

/// References resolved once per call.
struct Route {
    journal: JournalId,
    debit: AccountId,
    credit: AccountId,
    external: LocationId,
    warehouse: WarehouseZones,
    party: PartyId,
    digits: u32,
}

struct PreparedLine {
    product: ProductId,
    uom: Uom,
    quantity: Quantity,
    unit_price: UnitPrice,
}

#[derive(Clone, Copy)]
enum Direction {
    Purchase,
    Sale,
}

/// Posts purchases and sales for the session's company.
pub struct CommercePoster<'a> {
    read_models: &'a ReadModels,
    names: &'a ReferenceNames,
}

impl<'a> CommercePoster<'a> {
    pub fn new(read_models: &'a ReadModels, names: &'a ReferenceNames) -> Self {
        Self { read_models, names }
    }

    pub fn mark_bought<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        items: &[LineItem],
    ) -> Result<PostingReceipt, ServiceError> {
        let span = info_span!("mark_bought", company = %session.company_id, items = items.len());
        let _enter = span.enter();

        let result = self.post_purchase(uow, session, items);
        match &result {
            Ok(receipt) => info!(shipment = %receipt.shipment_id, moves = receipt.account_moves.len(), "purchase staged"),
            Err(e) => warn!(error = %e, "purchase aborted"),
        }
        result
    }

    pub fn mark_sold<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        items: &[LineItem],
    ) -> Result<PostingReceipt, ServiceError> {
        let span = info_span!("mark_sold", company = %session.company_id, items = items.len());
        let _enter = span.enter();

        let result = self.post_sale(uow, session, items);
        match &result {
            Ok(receipt) => info!(shipment = %receipt.shipment_id, moves = receipt.account_moves.len(), "sale staged"),
            Err(e) => warn!(error = %e, "sale aborted"),
        }
        result
    }

    fn post_purchase<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        items: &[LineItem],
    ) -> Result<PostingReceipt, ServiceError> {
        session.require(Permission::STOCK_SHIPMENT_WRITE)?;
        session.require(Permission::ACCOUNT_MOVE_POST)?;

        let route = self.resolve(uow, session, Direction::Purchase)?;
        let lines = prepare_lines(uow, session.company_id, items, route.digits)?;

        let incoming_moves = lines
            .iter()
            .map(|l| {
                StockMove::draft(
                    StockMoveId::generate(),
                    l.product,
                    l.uom,
                    l.quantity,
                    l.unit_price,
                    route.external,
                    route.warehouse.input,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let company_id = session.company_id;
        let shipment_id = ShipmentId::new(AggregateId::new());
        uow.dispatch::<ShipmentIn>(
            company_id,
            shipment_id,
            ShipmentInCommand::Create(CreateShipmentIn {
                company_id,
                shipment_id,
                supplier: route.party,
                warehouse: route.warehouse,
                incoming_moves: incoming_moves.clone(),
                occurred_at: session.now,
            }),
        )?;
        uow.dispatch::<ShipmentIn>(
            company_id,
            shipment_id,
            ShipmentInCommand::Receive(ReceiveShipmentIn {
                company_id,
                shipment_id,
                inventory_move_ids: fresh_move_ids(incoming_moves.len()),
                occurred_at: session.now,
            }),
        )?;
        uow.dispatch::<ShipmentIn>(
            company_id,
            shipment_id,
            ShipmentInCommand::Complete(CompleteShipmentIn {
                company_id,
                shipment_id,
                occurred_at: session.now,
            }),
        )?;

        let account_moves = self.stage_account_moves(uow, session, &route, &incoming_moves, Direction::Purchase)?;
        self.post_account_moves(uow, session, &account_moves)?;

        Ok(PostingReceipt {
            shipment_id,
            account_moves,
        })
    }

    fn post_sale<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        items: &[LineItem],
    ) -> Result<PostingReceipt, ServiceError> {
        session.require(Permission::STOCK_SHIPMENT_WRITE)?;
        session.require(Permission::ACCOUNT_MOVE_POST)?;

        let route = self.resolve(uow, session, Direction::Sale)?;
        let lines = prepare_lines(uow, session.company_id, items, route.digits)?;

        let outgoing_moves = lines
            .iter()
            .map(|l| {
                StockMove::draft(
                    StockMoveId::generate(),
                    l.product,
                    l.uom,
                    l.quantity,
                    l.unit_price,
                    route.warehouse.output,
                    route.external,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let company_id = session.company_id;
        let shipment_id = ShipmentId::new(AggregateId::new());
        uow.dispatch::<ShipmentOut>(
            company_id,
            shipment_id,
            ShipmentOutCommand::Create(CreateShipmentOut {
                company_id,
                shipment_id,
                customer: route.party,
                warehouse: route.warehouse,
                outgoing_moves: outgoing_moves.clone(),
                occurred_at: session.now,
            }),
        )?;
        uow.dispatch::<ShipmentOut>(
            company_id,
            shipment_id,
            ShipmentOutCommand::Wait(WaitShipmentOut {
                company_id,
                shipment_id,
                inventory_move_ids: fresh_move_ids(outgoing_moves.len()),
                occurred_at: session.now,
            }),
        )?;

        // Committed stock only: staged moves of this call never count.
        let available = self.storage_availability(company_id, route.warehouse.storage, &lines);
        uow.dispatch::<ShipmentOut>(
            company_id,
            shipment_id,
            ShipmentOutCommand::Assign(AssignShipmentOut {
                company_id,
                shipment_id,
                available,
                occurred_at: session.now,
            }),
        )?;
        uow.dispatch::<ShipmentOut>(
            company_id,
            shipment_id,
            ShipmentOutCommand::Pack(PackShipmentOut {
                company_id,
                shipment_id,
                occurred_at: session.now,
            }),
        )?;
        uow.dispatch::<ShipmentOut>(
            company_id,
            shipment_id,
            ShipmentOutCommand::Complete(CompleteShipmentOut {
                company_id,
                shipment_id,
                occurred_at: session.now,
            }),
        )?;

        let account_moves = self.stage_account_moves(uow, session, &route, &outgoing_moves, Direction::Sale)?;
        self.post_account_moves(uow, session, &account_moves)?;

        Ok(PostingReceipt {
            shipment_id,
            account_moves,
        })
    }

    /// Company, counterpart party, currency digits and every named reference.
    fn resolve<D: CommandDispatcher>(
        &self,
        uow: &D,
        session: &Session,
        direction: Direction,
    ) -> Result<Route, ServiceError> {
        let company: Company = uow.load(CompanyId::shared(), session.company_id)?;
        if !company.is_created() {
            return Err(unknown(ReferenceKind::Company, session.company_id).into());
        }
        let party = match direction {
            Direction::Purchase => company.supplier(),
            Direction::Sale => company.customer(),
        }
        .ok_or_else(|| ServiceError::Validation(format!("company {} has no counterpart party", session.company_id)))?;
        let currency = company
            .currency()
            .ok_or_else(|| ServiceError::Validation(format!("company {} has no currency", session.company_id)))?;

        let lookup = ReferenceLookup::new(&self.read_models.directory, session.company_id);
        let names = self.names;
        let journal = lookup.journal(&names.cash_journal)?;
        let revenue = lookup.account(&names.revenue_account)?;
        let (debit, credit, external) = match direction {
            Direction::Purchase => (
                revenue,
                lookup.account(&names.payable_account)?,
                lookup.location(&names.supplier_location)?,
            ),
            Direction::Sale => (
                lookup.account(&names.receivable_account)?,
                revenue,
                lookup.location(&names.customer_location)?,
            ),
        };
        let warehouse = WarehouseZones {
            input: lookup.location(&names.input_zone)?,
            storage: lookup.location(&names.storage_zone)?,
            output: lookup.location(&names.output_zone)?,
        };
        let digits = lookup.currency_digits(currency)?;

        Ok(Route {
            journal,
            debit,
            credit,
            external,
            warehouse,
            party,
            digits,
        })
    }

    fn storage_availability(
        &self,
        company_id: CompanyId,
        storage: LocationId,
        lines: &[PreparedLine],
    ) -> Vec<StockAvailability> {
        let mut products: Vec<ProductId> = lines.iter().map(|l| l.product).collect();
        products.sort();
        products.dedup();
        products
            .into_iter()
            .map(|product_id| StockAvailability {
                product_id,
                quantity: self.read_models.stock_levels.on_hand(company_id, storage, product_id),
            })
            .collect()
    }

    fn stage_account_moves<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        route: &Route,
        stock_moves: &[StockMove],
        direction: Direction,
    ) -> Result<Vec<AccountMoveId>, ServiceError> {
        let company_id = session.company_id;
        let mut ids = Vec::with_capacity(stock_moves.len());
        for stock_move in stock_moves {
            let amount = extend_amount(stock_move.quantity, stock_move.unit_price, route.digits)?;
            let lines = match direction {
                Direction::Purchase => vec![
                    MoveLine::debit(route.debit, amount, None),
                    MoveLine::credit(route.credit, amount, Some(route.party)),
                ],
                Direction::Sale => vec![
                    MoveLine::debit(route.debit, amount, Some(route.party)),
                    MoveLine::credit(route.credit, amount, None),
                ],
            };

            let move_id = AccountMoveId::new(AggregateId::new());
            uow.dispatch::<AccountMove>(
                company_id,
                move_id,
                AccountMoveCommand::Create(CreateAccountMove {
                    company_id,
                    move_id,
                    journal: route.journal,
                    date: session.today(),
                    origin: Some(MoveOrigin::StockMove(stock_move.id)),
                    lines,
                    occurred_at: session.now,
                }),
            )?;
            ids.push(move_id);
        }
        Ok(ids)
    }

    /// Post a batch of draft moves, numbering each from its fiscal year's sequence.
    fn post_account_moves<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        move_ids: &[AccountMoveId],
    ) -> Result<(), ServiceError> {
        let company_id = session.company_id;
        let lookup = ReferenceLookup::new(&self.read_models.directory, company_id);

        for &move_id in move_ids {
            let account_move: AccountMove = uow.load(company_id, move_id)?;
            let date = account_move.date().ok_or(DispatchError::NotFound)?;

            let fiscal_year_id = lookup.fiscal_year_for(date)?;
            let fiscal_year: FiscalYear = uow.load(company_id, fiscal_year_id)?;
            let period = fiscal_year.open_period_for(date).cloned().ok_or_else(|| {
                ServiceError::StateTransition(format!(
                    "no open period for {date} in fiscal year {}",
                    fiscal_year.name()
                ))
            })?;
            let sequence_id = fiscal_year.post_move_sequence().ok_or_else(|| {
                ServiceError::Validation(format!("fiscal year {} has no post move sequence", fiscal_year.name()))
            })?;

            let sequence: Sequence = uow.load(company_id, sequence_id)?;
            let number = sequence.format(sequence.next_number());
            uow.dispatch::<Sequence>(
                company_id,
                sequence_id,
                SequenceCommand::Issue(IssueNumber {
                    company_id,
                    sequence_id,
                    occurred_at: session.now,
                }),
            )?;

            uow.dispatch::<AccountMove>(
                company_id,
                move_id,
                AccountMoveCommand::Post(PostAccountMove {
                    company_id,
                    move_id,
                    fiscal_year: fiscal_year_id,
                    period,
                    number,
                    occurred_at: session.now,
                }),
            )?;
        }
        Ok(())
    }
}

/// Load every product up front; all must be goods of this company and every
/// line amount must fit in a `Decimal`.
fn prepare_lines<D: CommandDispatcher>(
    uow: &D,
    company_id: CompanyId,
    items: &[LineItem],
    digits: u32,
) -> Result<Vec<PreparedLine>, ServiceError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let quantity = Quantity::new(item.quantity)
                .map_err(|e| ServiceError::Validation(format!("item {idx}: {e}")))?;
            let unit_price = UnitPrice::new(item.unit_price)
                .map_err(|e| ServiceError::Validation(format!("item {idx}: {e}")))?;
            extend_amount(quantity, unit_price, digits)
                .map_err(|e| ServiceError::Validation(format!("item {idx}: {e}")))?;

            let product: Product = uow.load(company_id, item.product)?;
            if product.company_id().is_none() {
                return Err(unknown(ReferenceKind::Product, item.product.0).into());
            }
            if !product.can_be_moved() {
                return Err(ServiceError::Validation(format!(
                    "product '{}' cannot be moved in stock",
                    product.name()
                )));
            }

            Ok(PreparedLine {
                product: item.product,
                uom: product.default_uom(),
                quantity,
                unit_price,
            })
        })
        .collect()
}

fn fresh_move_ids(n: usize) -> Vec<StockMoveId> {
    (0..n).map(|_| StockMoveId::generate()).collect()
}

fn unknown(kind: ReferenceKind, id: impl core::fmt::Display) -> LookupError {
    LookupError::Unknown {
        kind,
        id: id.to_string(),
    }
}

/// Parse an RPC body (a JSON array of line items).
pub fn parse_line_items(body: JsonValue) -> Result<Vec<LineItem>, ServiceError> {
    serde_json::from_value(body).map_err(|e| ServiceError::Validation(format!("malformed line items: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn line_items_accept_numbers_and_strings() {
        let product = ProductId::new(AggregateId::new());
        let items = parse_line_items(json!([
            { "product": product, "quantity": 3, "unit_price": "10.50" },
            { "product": product, "quantity": "0.5", "unit_price": 2 }
        ]))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, Decimal::new(1050, 2));
        assert_eq!(items[1].quantity, Decimal::new(5, 1));
    }

    #[test]
    fn malformed_line_items_are_validation_errors() {
        let err = parse_line_items(json!({ "product": "x" })).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
