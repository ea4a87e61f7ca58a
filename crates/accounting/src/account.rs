use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

/// Account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub AggregateId);

impl AccountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Account kind. `View` accounts only group children and never carry lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Receivable,
    Payable,
    Revenue,
    Expense,
    Other,
    View,
}

impl AccountKind {
    pub fn accepts_lines(&self) -> bool {
        !matches!(self, AccountKind::View)
    }
}

/// Aggregate root: Account (one node of a company's chart of accounts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    company_id: Option<CompanyId>,
    code: String,
    name: String,
    kind: AccountKind,
    parent: Option<AccountId>,
    version: u64,
    created: bool,
}

impl Account {
    pub fn empty(id: AccountId) -> Self {
        Self {
            id,
            company_id: None,
            code: String::new(),
            name: String::new(),
            kind: AccountKind::Other,
            parent: None,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn parent(&self) -> Option<AccountId> {
        self.parent
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccount {
    pub company_id: CompanyId,
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub parent: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    CreateAccount(CreateAccount),
}

/// Event: AccountCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub company_id: CompanyId,
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub parent: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCreated(AccountCreated),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCreated(_) => "accounting.account.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountCreated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::AccountCreated(e) => {
                self.id = e.account_id;
                self.company_id = Some(e.company_id);
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.kind = e.kind;
                self.parent = e.parent;
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::CreateAccount(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("account already exists"));
                }
                if cmd.name.trim().is_empty() {
                    return Err(DomainError::validation("account name cannot be empty"));
                }
                if cmd.parent == Some(cmd.account_id) {
                    return Err(DomainError::invariant("an account cannot be its own parent"));
                }
                Ok(vec![AccountEvent::AccountCreated(AccountCreated {
                    company_id: cmd.company_id,
                    account_id: cmd.account_id,
                    code: cmd.code.trim().to_string(),
                    name: cmd.name.trim().to_string(),
                    kind: cmd.kind,
                    parent: cmd.parent,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
