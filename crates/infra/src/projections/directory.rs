//! Directory of named records (reference data, parties, products, users).
//!
//! Workflows resolve configured names against this read model: the records of
//! the active company plus those of the shared scope.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value as JsonValue;

use shopkeeper_accounting::{
    AccountEvent, AccountKind, ChartTemplateEvent, FiscalYearEvent, JournalEvent, JournalKind,
    SequenceId,
};
use shopkeeper_auth::UserEvent;
use shopkeeper_company::{CompanyEvent, CurrencyEvent, CurrencyId};
use shopkeeper_core::{AggregateId, CompanyId};
use shopkeeper_events::EventEnvelope;
use shopkeeper_parties::{PartyEvent, PartyId, PartyKind};
use shopkeeper_products::{ProductEvent, ProductKind, Uom};
use shopkeeper_stock::{LocationEvent, LocationId, LocationKind};

use super::{ProjectionError, StreamCursors, check_company};
use crate::read_model::{CompanyStore, InMemoryCompanyStore};
use crate::streams::aggregate_types;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Party,
    Product,
    Location,
    Account,
    Journal,
    ChartTemplate,
    FiscalYear,
    Currency,
    Company,
    User,
}

impl core::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ReferenceKind::Party => "party",
            ReferenceKind::Product => "product",
            ReferenceKind::Location => "location",
            ReferenceKind::Account => "account",
            ReferenceKind::Journal => "journal",
            ReferenceKind::ChartTemplate => "chart template",
            ReferenceKind::FiscalYear => "fiscal year",
            ReferenceKind::Currency => "currency",
            ReferenceKind::Company => "company",
            ReferenceKind::User => "user",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceDetail {
    Party { party_kind: PartyKind },
    Product { product_kind: ProductKind, uom: Uom },
    Location { location_kind: LocationKind, parent: Option<LocationId> },
    Account { code: String, account_kind: AccountKind },
    Journal { code: String, journal_kind: JournalKind },
    ChartTemplate,
    FiscalYear { start: NaiveDate, end: NaiveDate, sequence: SequenceId },
    Currency { code: String, digits: u32 },
    Company { party: PartyId, currency: CurrencyId },
    User { login: String, main_company: CompanyId },
}

impl ReferenceDetail {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            ReferenceDetail::Party { .. } => ReferenceKind::Party,
            ReferenceDetail::Product { .. } => ReferenceKind::Product,
            ReferenceDetail::Location { .. } => ReferenceKind::Location,
            ReferenceDetail::Account { .. } => ReferenceKind::Account,
            ReferenceDetail::Journal { .. } => ReferenceKind::Journal,
            ReferenceDetail::ChartTemplate => ReferenceKind::ChartTemplate,
            ReferenceDetail::FiscalYear { .. } => ReferenceKind::FiscalYear,
            ReferenceDetail::Currency { .. } => ReferenceKind::Currency,
            ReferenceDetail::Company { .. } => ReferenceKind::Company,
            ReferenceDetail::User { .. } => ReferenceKind::User,
        }
    }
}

/// A named record and the scope it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub id: AggregateId,
    pub scope: CompanyId,
    pub name: String,
    pub detail: ReferenceDetail,
}

impl Reference {
    pub fn kind(&self) -> ReferenceKind {
        self.detail.kind()
    }
}

#[derive(Debug)]
pub struct DirectoryProjection<S = InMemoryCompanyStore<AggregateId, Reference>>
where
    S: CompanyStore<AggregateId, Reference>,
{
    store: S,
    cursors: StreamCursors,
}

impl Default for DirectoryProjection {
    fn default() -> Self {
        Self::new(InMemoryCompanyStore::new())
    }
}

impl<S> DirectoryProjection<S>
where
    S: CompanyStore<AggregateId, Reference>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, scope: CompanyId, id: AggregateId) -> Option<Reference> {
        self.store.get(scope, &id)
    }

    /// Records of exactly one scope.
    pub fn list(&self, scope: CompanyId) -> Vec<Reference> {
        self.store.list(scope)
    }

    /// Records a company can see: its own plus the shared ones.
    pub fn visible_to(&self, company_id: CompanyId) -> Vec<Reference> {
        let mut out = self.store.list(company_id);
        if !company_id.is_shared() {
            out.extend(self.store.list(CompanyId::shared()));
        }
        out
    }

    /// Users live in the shared scope; logins are stored lower-cased.
    pub fn find_login(&self, login: &str) -> Option<Reference> {
        let login = login.trim().to_lowercase();
        self.store
            .list(CompanyId::shared())
            .into_iter()
            .find(|r| matches!(&r.detail, ReferenceDetail::User { login: l, .. } if *l == login))
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let scope = envelope.company_id();
        let aggregate_id = envelope.aggregate_id();
        let payload = envelope.payload().clone();

        let tracked = matches!(
            envelope.aggregate_type(),
            aggregate_types::PARTY
                | aggregate_types::PRODUCT
                | aggregate_types::LOCATION
                | aggregate_types::ACCOUNT
                | aggregate_types::JOURNAL
                | aggregate_types::CHART_TEMPLATE
                | aggregate_types::FISCAL_YEAR
                | aggregate_types::CURRENCY
                | aggregate_types::COMPANY
                | aggregate_types::USER
        );
        if !tracked || !self.cursors.accept(envelope)? {
            return Ok(());
        }

        let record = |name: String, detail: ReferenceDetail| Reference {
            id: aggregate_id,
            scope,
            name,
            detail,
        };

        match envelope.aggregate_type() {
            aggregate_types::PARTY => {
                let PartyEvent::PartyRegistered(e) = decode::<PartyEvent>(payload)?;
                check_company(envelope, e.scope)?;
                self.store
                    .upsert(scope, aggregate_id, record(e.name, ReferenceDetail::Party { party_kind: e.kind }));
            }
            aggregate_types::PRODUCT => {
                let ProductEvent::ProductCreated(e) = decode::<ProductEvent>(payload)?;
                check_company(envelope, e.company_id)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::Product {
                            product_kind: e.kind,
                            uom: e.default_uom,
                        },
                    ),
                );
            }
            aggregate_types::LOCATION => {
                let LocationEvent::LocationCreated(e) = decode::<LocationEvent>(payload)?;
                check_company(envelope, e.scope)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::Location {
                            location_kind: e.kind,
                            parent: e.parent,
                        },
                    ),
                );
            }
            aggregate_types::ACCOUNT => {
                let AccountEvent::AccountCreated(e) = decode::<AccountEvent>(payload)?;
                check_company(envelope, e.company_id)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::Account {
                            code: e.code,
                            account_kind: e.kind,
                        },
                    ),
                );
            }
            aggregate_types::JOURNAL => {
                let JournalEvent::JournalCreated(e) = decode::<JournalEvent>(payload)?;
                check_company(envelope, e.scope)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::Journal {
                            code: e.code,
                            journal_kind: e.kind,
                        },
                    ),
                );
            }
            aggregate_types::CHART_TEMPLATE => {
                let ChartTemplateEvent::Created(e) = decode::<ChartTemplateEvent>(payload)?;
                check_company(envelope, e.scope)?;
                self.store
                    .upsert(scope, aggregate_id, record(e.name, ReferenceDetail::ChartTemplate));
            }
            aggregate_types::FISCAL_YEAR => {
                if let FiscalYearEvent::Created(e) = decode::<FiscalYearEvent>(payload)? {
                    check_company(envelope, e.company_id)?;
                    self.store.upsert(
                        scope,
                        aggregate_id,
                        record(
                            e.name,
                            ReferenceDetail::FiscalYear {
                                start: e.start,
                                end: e.end,
                                sequence: e.post_move_sequence,
                            },
                        ),
                    );
                }
            }
            aggregate_types::CURRENCY => {
                let CurrencyEvent::Created(e) = decode::<CurrencyEvent>(payload)?;
                check_company(envelope, e.scope)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::Currency {
                            code: e.code,
                            digits: e.digits,
                        },
                    ),
                );
            }
            aggregate_types::COMPANY => {
                if let CompanyEvent::Registered(e) = decode::<CompanyEvent>(payload)? {
                    // The company's display name is its owner party's name.
                    let name = self
                        .store
                        .get(scope, &e.party.0)
                        .map(|p| p.name)
                        .unwrap_or_default();
                    self.store.upsert(
                        scope,
                        aggregate_id,
                        record(
                            name,
                            ReferenceDetail::Company {
                                party: e.party,
                                currency: e.currency,
                            },
                        ),
                    );
                }
            }
            aggregate_types::USER => {
                let UserEvent::Created(e) = decode::<UserEvent>(payload)?;
                self.store.upsert(
                    scope,
                    aggregate_id,
                    record(
                        e.name,
                        ReferenceDetail::User {
                            login: e.login,
                            main_company: e.main_company,
                        },
                    ),
                );
            }
            _ => {}
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }
}

fn decode<E: serde::de::DeserializeOwned>(payload: JsonValue) -> Result<E, ProjectionError> {
    serde_json::from_value(payload).map_err(|e| ProjectionError::Deserialize(e.to_string()))
}
