//! Name-based resolution of reference records.
//!
//! A name must match exactly one record among the active company's records and
//! the shared ones; zero or several matches are errors. Nothing is cached: each
//! call reads the directory as it is.

use chrono::NaiveDate;
use thiserror::Error;

use shopkeeper_accounting::{AccountId, AccountKind, ChartTemplateId, FiscalYearId, JournalId};
use shopkeeper_company::CurrencyId;
use shopkeeper_core::CompanyId;
use shopkeeper_stock::LocationId;

use crate::projections::{DirectoryProjection, Reference, ReferenceDetail, ReferenceKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no {kind} named '{name}'")]
    Missing { kind: ReferenceKind, name: String },

    #[error("{count} {kind} records are named '{name}'")]
    Ambiguous {
        kind: ReferenceKind,
        name: String,
        count: usize,
    },

    #[error("expected exactly one {kind} ({criterion}), found {count}")]
    NotUnique {
        kind: ReferenceKind,
        criterion: String,
        count: usize,
    },

    #[error("unknown {kind} {id}")]
    Unknown { kind: ReferenceKind, id: String },
}

/// Resolves names within one company's view of the directory.
pub struct ReferenceLookup<'a> {
    directory: &'a DirectoryProjection,
    company_id: CompanyId,
}

impl<'a> ReferenceLookup<'a> {
    pub fn new(directory: &'a DirectoryProjection, company_id: CompanyId) -> Self {
        Self {
            directory,
            company_id,
        }
    }

    /// Exactly one visible record of `kind` named `name`.
    pub fn by_name(&self, kind: ReferenceKind, name: &str) -> Result<Reference, LookupError> {
        let mut matches: Vec<Reference> = self
            .directory
            .visible_to(self.company_id)
            .into_iter()
            .filter(|r| r.kind() == kind && r.name == name)
            .collect();
        match matches.len() {
            0 => Err(LookupError::Missing {
                kind,
                name: name.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(LookupError::Ambiguous {
                kind,
                name: name.to_string(),
                count,
            }),
        }
    }

    pub fn location(&self, name: &str) -> Result<LocationId, LookupError> {
        self.by_name(ReferenceKind::Location, name)
            .map(|r| LocationId::new(r.id))
    }

    pub fn journal(&self, name: &str) -> Result<JournalId, LookupError> {
        self.by_name(ReferenceKind::Journal, name)
            .map(|r| JournalId::new(r.id))
    }

    pub fn account(&self, name: &str) -> Result<AccountId, LookupError> {
        self.by_name(ReferenceKind::Account, name)
            .map(|r| AccountId::new(r.id))
    }

    /// Currencies are looked up by ISO code rather than display name.
    pub fn currency(&self, code: &str) -> Result<(CurrencyId, u32), LookupError> {
        let code = code.trim().to_uppercase();
        let found: Vec<(CurrencyId, u32)> = self
            .directory
            .visible_to(self.company_id)
            .into_iter()
            .filter_map(|r| match r.detail {
                ReferenceDetail::Currency { code: c, digits } if c == code => {
                    Some((CurrencyId::new(r.id), digits))
                }
                _ => None,
            })
            .collect();
        match found.as_slice() {
            [one] => Ok(*one),
            [] => Err(LookupError::Missing {
                kind: ReferenceKind::Currency,
                name: code,
            }),
            many => Err(LookupError::Ambiguous {
                kind: ReferenceKind::Currency,
                name: code,
                count: many.len(),
            }),
        }
    }

    /// Digits of a currency known by id.
    pub fn currency_digits(&self, currency_id: CurrencyId) -> Result<u32, LookupError> {
        match self
            .directory
            .get(CompanyId::shared(), currency_id.0)
            .or_else(|| self.directory.get(self.company_id, currency_id.0))
            .map(|r| r.detail)
        {
            Some(ReferenceDetail::Currency { digits, .. }) => Ok(digits),
            _ => Err(LookupError::Unknown {
                kind: ReferenceKind::Currency,
                id: currency_id.0.to_string(),
            }),
        }
    }

    /// The single chart template signup instantiates.
    pub fn root_chart_template(&self) -> Result<ChartTemplateId, LookupError> {
        let templates: Vec<Reference> = self
            .directory
            .visible_to(self.company_id)
            .into_iter()
            .filter(|r| r.kind() == ReferenceKind::ChartTemplate)
            .collect();
        match templates.as_slice() {
            [one] => Ok(ChartTemplateId::new(one.id)),
            other => Err(LookupError::NotUnique {
                kind: ReferenceKind::ChartTemplate,
                criterion: "root template".to_string(),
                count: other.len(),
            }),
        }
    }

    /// The company's single account of `kind`.
    pub fn account_of_kind(&self, kind: AccountKind) -> Result<AccountId, LookupError> {
        let accounts: Vec<AccountId> = self
            .directory
            .list(self.company_id)
            .into_iter()
            .filter(|r| matches!(r.detail, ReferenceDetail::Account { account_kind, .. } if account_kind == kind))
            .map(|r| AccountId::new(r.id))
            .collect();
        match accounts.as_slice() {
            [one] => Ok(*one),
            other => Err(LookupError::NotUnique {
                kind: ReferenceKind::Account,
                criterion: format!("{kind:?} account"),
                count: other.len(),
            }),
        }
    }

    /// The company's fiscal year covering `date`.
    pub fn fiscal_year_for(&self, date: NaiveDate) -> Result<FiscalYearId, LookupError> {
        let years: Vec<FiscalYearId> = self
            .directory
            .list(self.company_id)
            .into_iter()
            .filter(|r| {
                matches!(r.detail, ReferenceDetail::FiscalYear { start, end, .. } if start <= date && date <= end)
            })
            .map(|r| FiscalYearId::new(r.id))
            .collect();
        match years.as_slice() {
            [one] => Ok(*one),
            other => Err(LookupError::NotUnique {
                kind: ReferenceKind::FiscalYear,
                criterion: format!("covering {date}"),
                count: other.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, json};
    use shopkeeper_core::AggregateId;
    use shopkeeper_events::EventEnvelope;
    use uuid::Uuid;

    use crate::streams::aggregate_types;

    fn location(scope: CompanyId, name: &str) -> EventEnvelope<JsonValue> {
        let id = AggregateId::new();
        EventEnvelope::new(
            Uuid::now_v7(),
            scope,
            id,
            aggregate_types::LOCATION,
            1,
            "stock.location.created",
            json!({ "LocationCreated": {
                "scope": scope,
                "location_id": id,
                "code": name.to_uppercase(),
                "name": name,
                "kind": "storage",
                "parent": null,
                "occurred_at": "2026-01-01T00:00:00Z"
            }}),
        )
    }

    #[test]
    fn shared_and_company_records_are_both_visible() {
        let directory = DirectoryProjection::default();
        let company_id = CompanyId::new();
        directory.apply_envelope(&location(CompanyId::shared(), "Input Zone")).unwrap();
        directory.apply_envelope(&location(company_id, "Back Room")).unwrap();

        let lookup = ReferenceLookup::new(&directory, company_id);
        assert!(lookup.location("Input Zone").is_ok());
        assert!(lookup.location("Back Room").is_ok());

        let other = ReferenceLookup::new(&directory, CompanyId::new());
        assert_eq!(
            other.location("Back Room"),
            Err(LookupError::Missing {
                kind: ReferenceKind::Location,
                name: "Back Room".to_string()
            })
        );
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let directory = DirectoryProjection::default();
        let company_id = CompanyId::new();
        directory.apply_envelope(&location(CompanyId::shared(), "Input Zone")).unwrap();
        directory.apply_envelope(&location(company_id, "Input Zone")).unwrap();

        let err = ReferenceLookup::new(&directory, company_id)
            .location("Input Zone")
            .unwrap_err();
        assert!(matches!(err, LookupError::Ambiguous { count: 2, .. }));
        assert_eq!(err.to_string(), "2 location records are named 'Input Zone'");
    }
}
