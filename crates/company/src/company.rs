use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_accounting::AccountId;
use shopkeeper_core::{Aggregate, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;
use shopkeeper_parties::PartyId;

use crate::currency::CurrencyId;

/// Aggregate root: Company.
///
/// Every company carries the customer and supplier parties its sales and
/// purchases are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    id: CompanyId,
    party: Option<PartyId>,
    currency: Option<CurrencyId>,
    customer: Option<PartyId>,
    supplier: Option<PartyId>,
    default_receivable: Option<AccountId>,
    default_payable: Option<AccountId>,
    version: u64,
    created: bool,
}

impl Company {
    pub fn empty(id: CompanyId) -> Self {
        Self {
            id,
            party: None,
            currency: None,
            customer: None,
            supplier: None,
            default_receivable: None,
            default_payable: None,
            version: 0,
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn party(&self) -> Option<PartyId> {
        self.party
    }

    pub fn currency(&self) -> Option<CurrencyId> {
        self.currency
    }

    pub fn customer(&self) -> Option<PartyId> {
        self.customer
    }

    pub fn supplier(&self) -> Option<PartyId> {
        self.supplier
    }

    pub fn default_receivable(&self) -> Option<AccountId> {
        self.default_receivable
    }

    pub fn default_payable(&self) -> Option<AccountId> {
        self.default_payable
    }
}

impl AggregateRoot for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCompany {
    pub company_id: CompanyId,
    pub party: PartyId,
    pub currency: CurrencyId,
    pub customer: PartyId,
    pub supplier: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureDefaultAccounts {
    pub company_id: CompanyId,
    pub receivable: AccountId,
    pub payable: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyCommand {
    Register(RegisterCompany),
    ConfigureDefaultAccounts(ConfigureDefaultAccounts),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistered {
    pub company_id: CompanyId,
    pub party: PartyId,
    pub currency: CurrencyId,
    pub customer: PartyId,
    pub supplier: PartyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAccountsConfigured {
    pub company_id: CompanyId,
    pub receivable: AccountId,
    pub payable: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyEvent {
    Registered(CompanyRegistered),
    DefaultAccountsConfigured(DefaultAccountsConfigured),
}

impl Event for CompanyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompanyEvent::Registered(_) => "company.company.registered",
            CompanyEvent::DefaultAccountsConfigured(_) => "company.company.default_accounts_configured",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CompanyEvent::Registered(e) => e.occurred_at,
            CompanyEvent::DefaultAccountsConfigured(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Company {
    type Command = CompanyCommand;
    type Event = CompanyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CompanyEvent::Registered(e) => {
                self.id = e.company_id;
                self.party = Some(e.party);
                self.currency = Some(e.currency);
                self.customer = Some(e.customer);
                self.supplier = Some(e.supplier);
                self.created = true;
            }
            CompanyEvent::DefaultAccountsConfigured(e) => {
                self.default_receivable = Some(e.receivable);
                self.default_payable = Some(e.payable);
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CompanyCommand::Register(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("company already exists"));
                }
                if cmd.company_id.is_shared() {
                    return Err(DomainError::invalid_id("the shared scope cannot be a company"));
                }
                if cmd.customer == cmd.supplier {
                    return Err(DomainError::invariant(
                        "company customer and supplier must be different parties",
                    ));
                }
                if cmd.customer == cmd.party || cmd.supplier == cmd.party {
                    return Err(DomainError::invariant(
                        "company customer and supplier cannot be the company's own party",
                    ));
                }
                Ok(vec![CompanyEvent::Registered(CompanyRegistered {
                    company_id: cmd.company_id,
                    party: cmd.party,
                    currency: cmd.currency,
                    customer: cmd.customer,
                    supplier: cmd.supplier,
                    occurred_at: cmd.occurred_at,
                })])
            }
            CompanyCommand::ConfigureDefaultAccounts(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if cmd.receivable == cmd.payable {
                    return Err(DomainError::invariant(
                        "default receivable and payable accounts must differ",
                    ));
                }
                Ok(vec![CompanyEvent::DefaultAccountsConfigured(DefaultAccountsConfigured {
                    company_id: cmd.company_id,
                    receivable: cmd.receivable,
                    payable: cmd.payable,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
