use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(pub AggregateId);

impl CurrencyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Currencies installed with the reference data: `(code, name, digits)`.
pub const DEFAULT_CURRENCIES: [(&str, &str, u32); 3] = [
    ("INR", "Indian Rupee", 2),
    ("USD", "U.S. Dollar", 2),
    ("EUR", "Euro", 2),
];

const MAX_DIGITS: u32 = 6;

/// Aggregate root: Currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    id: CurrencyId,
    code: String,
    name: String,
    digits: u32,
    version: u64,
    created: bool,
}

impl Currency {
    pub fn empty(id: CurrencyId) -> Self {
        Self {
            id,
            code: String::new(),
            name: String::new(),
            digits: 2,
            version: 0,
            created: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of decimal places amounts in this currency are rounded to.
    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl AggregateRoot for Currency {
    type Id = CurrencyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCurrency {
    pub scope: CompanyId,
    pub currency_id: CurrencyId,
    pub code: String,
    pub name: String,
    pub digits: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyCommand {
    Create(CreateCurrency),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyCreated {
    pub scope: CompanyId,
    pub currency_id: CurrencyId,
    pub code: String,
    pub name: String,
    pub digits: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyEvent {
    Created(CurrencyCreated),
}

impl Event for CurrencyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CurrencyEvent::Created(_) => "company.currency.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CurrencyEvent::Created(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Currency {
    type Command = CurrencyCommand;
    type Event = CurrencyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CurrencyEvent::Created(e) => {
                self.id = e.currency_id;
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.digits = e.digits;
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CurrencyCommand::Create(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("currency already exists"));
                }
                let code = cmd.code.trim().to_uppercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(DomainError::validation(format!(
                        "currency code must be three letters (got '{}')",
                        cmd.code
                    )));
                }
                if cmd.digits > MAX_DIGITS {
                    return Err(DomainError::validation(format!(
                        "currency digits must be at most {MAX_DIGITS}"
                    )));
                }
                Ok(vec![CurrencyEvent::Created(CurrencyCreated {
                    scope: cmd.scope,
                    currency_id: cmd.currency_id,
                    code,
                    name: cmd.name.trim().to_string(),
                    digits: cmd.digits,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeeper_core::aggregate::execute;

    fn create(code: &str, digits: u32) -> (Currency, Result<Vec<CurrencyEvent>, DomainError>) {
        let id = CurrencyId::new(AggregateId::new());
        let mut currency = Currency::empty(id);
        let result = execute(
            &mut currency,
            &CurrencyCommand::Create(CreateCurrency {
                scope: CompanyId::shared(),
                currency_id: id,
                code: code.to_string(),
                name: "Test".to_string(),
                digits,
                occurred_at: Utc::now(),
            }),
        );
        (currency, result)
    }

    #[test]
    fn code_is_uppercased() {
        let (currency, result) = create("inr", 2);
        result.unwrap();
        assert_eq!(currency.code(), "INR");
        assert_eq!(currency.digits(), 2);
    }

    #[test]
    fn malformed_codes_and_digits_are_rejected() {
        assert!(create("RUPEE", 2).1.is_err());
        assert!(create("U$D", 2).1.is_err());
        assert!(create("JPY", 9).1.is_err());
    }
}
