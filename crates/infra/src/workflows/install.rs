//! Shared reference data: currencies, warehouse locations, journals and the
//! minimal chart template.
//!
//! Records are matched by name (currencies by code) against the committed
//! directory; anything already present is left alone, so running the
//! installation twice changes nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span};

use shopkeeper_accounting::{
    ChartTemplate, ChartTemplateCommand, ChartTemplateId, CreateChartTemplate, CreateJournal,
    Journal, JournalCommand, JournalId, JournalKind, MINIMAL_CHART_NAME, minimal_chart,
};
use shopkeeper_company::{CreateCurrency, Currency, CurrencyCommand, CurrencyId, DEFAULT_CURRENCIES};
use shopkeeper_core::{AggregateId, CompanyId};
use shopkeeper_stock::{CreateLocation, Location, LocationCommand, LocationId, LocationKind};

use crate::command_dispatcher::CommandDispatcher;
use crate::error::ServiceError;
use crate::lookup::{LookupError, ReferenceLookup};
use crate::projections::{DirectoryProjection, ReferenceKind};

const WAREHOUSE: (&str, &str) = ("WH", "Warehouse");

/// Warehouse zones: `(code, name)`.
const ZONES: [(&str, &str); 3] = [
    ("IN", "Input Zone"),
    ("OUT", "Output Zone"),
    ("STO", "Storage Zone"),
];

const JOURNALS: [(&str, &str, JournalKind); 5] = [
    ("REV", "Revenue", JournalKind::Revenue),
    ("EXP", "Expense", JournalKind::Expense),
    ("CASH", "Cash", JournalKind::Cash),
    ("STO", "Stock", JournalKind::Stock),
    ("MISC", "Miscellaneous", JournalKind::General),
];

/// Number of records created by one installation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub created: usize,
}

pub fn install_defaults<D: CommandDispatcher>(
    uow: &mut D,
    directory: &DirectoryProjection,
    now: DateTime<Utc>,
) -> Result<InstallReport, ServiceError> {
    let span = info_span!("install_defaults");
    let _enter = span.enter();

    let shared = CompanyId::shared();
    let lookup = ReferenceLookup::new(directory, shared);
    let mut report = InstallReport::default();

    for (code, name, digits) in DEFAULT_CURRENCIES {
        if absent(lookup.currency(code))? {
            let currency_id = CurrencyId::new(AggregateId::new());
            uow.dispatch::<Currency>(
                shared,
                currency_id,
                CurrencyCommand::Create(CreateCurrency {
                    scope: shared,
                    currency_id,
                    code: code.to_string(),
                    name: name.to_string(),
                    digits,
                    occurred_at: now,
                }),
            )?;
            report.created += 1;
        }
    }

    for (code, name, kind) in [
        ("SUP", "Supplier", LocationKind::Supplier),
        ("CUS", "Customer", LocationKind::Customer),
    ] {
        ensure_location(uow, &lookup, code, name, kind, None, now, &mut report)?;
    }
    let warehouse = ensure_location(
        uow,
        &lookup,
        WAREHOUSE.0,
        WAREHOUSE.1,
        LocationKind::Warehouse,
        None,
        now,
        &mut report,
    )?;
    for (code, name) in ZONES {
        ensure_location(uow, &lookup, code, name, LocationKind::Storage, Some(warehouse), now, &mut report)?;
    }

    for (code, name, kind) in JOURNALS {
        if absent(lookup.by_name(ReferenceKind::Journal, name))? {
            let journal_id = JournalId::new(AggregateId::new());
            uow.dispatch::<Journal>(
                shared,
                journal_id,
                JournalCommand::CreateJournal(CreateJournal {
                    scope: shared,
                    journal_id,
                    code: code.to_string(),
                    name: name.to_string(),
                    kind,
                    occurred_at: now,
                }),
            )?;
            report.created += 1;
        }
    }

    if absent(lookup.by_name(ReferenceKind::ChartTemplate, MINIMAL_CHART_NAME))? {
        let template_id = ChartTemplateId::new(AggregateId::new());
        uow.dispatch::<ChartTemplate>(
            shared,
            template_id,
            ChartTemplateCommand::Create(CreateChartTemplate {
                scope: shared,
                template_id,
                name: MINIMAL_CHART_NAME.to_string(),
                accounts: minimal_chart(),
                occurred_at: now,
            }),
        )?;
        report.created += 1;
    }

    info!(created = report.created, "reference data installed");
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn ensure_location<D: CommandDispatcher>(
    uow: &mut D,
    lookup: &ReferenceLookup<'_>,
    code: &str,
    name: &str,
    kind: LocationKind,
    parent: Option<LocationId>,
    now: DateTime<Utc>,
    report: &mut InstallReport,
) -> Result<LocationId, ServiceError> {
    match lookup.location(name) {
        Ok(existing) => return Ok(existing),
        Err(LookupError::Missing { .. }) => {}
        Err(other) => return Err(other.into()),
    }

    let shared = CompanyId::shared();
    let location_id = LocationId::new(AggregateId::new());
    uow.dispatch::<Location>(
        shared,
        location_id,
        LocationCommand::CreateLocation(CreateLocation {
            scope: shared,
            location_id,
            code: code.to_string(),
            name: name.to_string(),
            kind,
            parent,
            occurred_at: now,
        }),
    )?;
    report.created += 1;
    Ok(location_id)
}

/// `Missing` means "install it"; duplicates are still an error.
fn absent<T>(found: Result<T, LookupError>) -> Result<bool, ServiceError> {
    match found {
        Ok(_) => Ok(false),
        Err(LookupError::Missing { .. }) => Ok(true),
        Err(other) => Err(other.into()),
    }
}
