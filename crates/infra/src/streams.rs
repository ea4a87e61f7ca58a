//! Binding between aggregates and their event streams.

use shopkeeper_accounting::{
    Account, AccountId, AccountMove, AccountMoveId, ChartTemplate, ChartTemplateId, FiscalYear,
    FiscalYearId, Journal, JournalId, Sequence, SequenceId,
};
use shopkeeper_auth::User;
use shopkeeper_company::{Company, Currency, CurrencyId};
use shopkeeper_core::{Aggregate, AggregateId, DomainError, UserId};
use shopkeeper_parties::{Party, PartyId};
use shopkeeper_products::{Product, ProductId};
use shopkeeper_stock::{Location, LocationId, ShipmentId, ShipmentIn, ShipmentOut};

/// An aggregate persisted as one event stream per instance.
pub trait Streamed: Aggregate<Error = DomainError> + Sized {
    /// Stream type tag, e.g. `"stock.shipment_in"`.
    const AGGREGATE_TYPE: &'static str;

    fn stream_id(id: &Self::Id) -> AggregateId;

    /// Fresh instance to rehydrate history into.
    fn empty_for(id: Self::Id) -> Self;
}

pub mod aggregate_types {
    pub const PARTY: &str = "parties.party";
    pub const PRODUCT: &str = "products.product";
    pub const LOCATION: &str = "stock.location";
    pub const SHIPMENT_IN: &str = "stock.shipment_in";
    pub const SHIPMENT_OUT: &str = "stock.shipment_out";
    pub const ACCOUNT: &str = "accounting.account";
    pub const ACCOUNT_MOVE: &str = "accounting.account_move";
    pub const JOURNAL: &str = "accounting.journal";
    pub const SEQUENCE: &str = "accounting.sequence";
    pub const FISCAL_YEAR: &str = "accounting.fiscal_year";
    pub const CHART_TEMPLATE: &str = "accounting.chart_template";
    pub const COMPANY: &str = "company.company";
    pub const CURRENCY: &str = "company.currency";
    pub const USER: &str = "auth.user";
}

macro_rules! streamed {
    ($aggregate:ty, $id:ty, $kind:expr) => {
        impl Streamed for $aggregate {
            const AGGREGATE_TYPE: &'static str = $kind;

            fn stream_id(id: &$id) -> AggregateId {
                id.0
            }

            fn empty_for(id: $id) -> Self {
                <$aggregate>::empty(id)
            }
        }
    };
}

streamed!(Party, PartyId, aggregate_types::PARTY);
streamed!(Product, ProductId, aggregate_types::PRODUCT);
streamed!(Location, LocationId, aggregate_types::LOCATION);
streamed!(ShipmentIn, ShipmentId, aggregate_types::SHIPMENT_IN);
streamed!(ShipmentOut, ShipmentId, aggregate_types::SHIPMENT_OUT);
streamed!(Account, AccountId, aggregate_types::ACCOUNT);
streamed!(AccountMove, AccountMoveId, aggregate_types::ACCOUNT_MOVE);
streamed!(Journal, JournalId, aggregate_types::JOURNAL);
streamed!(Sequence, SequenceId, aggregate_types::SEQUENCE);
streamed!(FiscalYear, FiscalYearId, aggregate_types::FISCAL_YEAR);
streamed!(ChartTemplate, ChartTemplateId, aggregate_types::CHART_TEMPLATE);
streamed!(Currency, CurrencyId, aggregate_types::CURRENCY);

impl Streamed for Company {
    const AGGREGATE_TYPE: &'static str = aggregate_types::COMPANY;

    fn stream_id(id: &shopkeeper_core::CompanyId) -> AggregateId {
        id.as_aggregate_id()
    }

    fn empty_for(id: shopkeeper_core::CompanyId) -> Self {
        Company::empty(id)
    }
}

impl Streamed for User {
    const AGGREGATE_TYPE: &'static str = aggregate_types::USER;

    fn stream_id(id: &UserId) -> AggregateId {
        AggregateId::from_uuid(*id.as_uuid())
    }

    fn empty_for(id: UserId) -> Self {
        User::empty(id)
    }
}
