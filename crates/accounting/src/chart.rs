//! Chart of accounts templates.
//!
//! A template lives in the shared scope and is instantiated into a company's
//! own accounts. The template's accounts form a tree with a single view root.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

use crate::account::AccountKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartTemplateId(pub AggregateId);

impl ChartTemplateId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ChartTemplateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One account of a template, linked to its parent by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTemplate {
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub parent_code: Option<String>,
}

impl AccountTemplate {
    fn leaf(code: &str, name: &str, kind: AccountKind, parent: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            kind,
            parent_code: Some(parent.to_string()),
        }
    }
}

pub const MINIMAL_CHART_NAME: &str = "Minimal Account Chart";

/// The minimal chart: a view root with one account per kind the workflows use.
pub fn minimal_chart() -> Vec<AccountTemplate> {
    vec![
        AccountTemplate {
            code: "0".to_string(),
            name: MINIMAL_CHART_NAME.to_string(),
            kind: AccountKind::View,
            parent_code: None,
        },
        AccountTemplate::leaf("1100", "Main Receivable", AccountKind::Receivable, "0"),
        AccountTemplate::leaf("2100", "Main Payable", AccountKind::Payable, "0"),
        AccountTemplate::leaf("4000", "Main Revenue", AccountKind::Revenue, "0"),
        AccountTemplate::leaf("5000", "Main Expense", AccountKind::Expense, "0"),
        AccountTemplate::leaf("1000", "Main Cash", AccountKind::Other, "0"),
    ]
}

/// Check the template is a tree with one view root, and return its accounts
/// ordered so that every parent comes before its children.
pub fn plan_accounts(accounts: &[AccountTemplate]) -> Result<Vec<AccountTemplate>, DomainError> {
    let mut codes = HashSet::new();
    for a in accounts {
        if a.code.trim().is_empty() || a.name.trim().is_empty() {
            return Err(DomainError::validation("template accounts need a code and a name"));
        }
        if !codes.insert(a.code.as_str()) {
            return Err(DomainError::validation(format!(
                "duplicate template account code {}",
                a.code
            )));
        }
    }

    let roots: Vec<&AccountTemplate> = accounts.iter().filter(|a| a.parent_code.is_none()).collect();
    match roots.as_slice() {
        [root] if root.kind == AccountKind::View => {}
        [_] => return Err(DomainError::validation("the template root must be a view account")),
        _ => {
            return Err(DomainError::validation(format!(
                "a template needs exactly one root account, found {}",
                roots.len()
            )));
        }
    }

    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(accounts.len());
    while ordered.len() < accounts.len() {
        let before = ordered.len();
        for a in accounts {
            if placed.contains(a.code.as_str()) {
                continue;
            }
            let ready = match &a.parent_code {
                None => true,
                Some(parent) => placed.contains(parent.as_str()),
            };
            if ready {
                placed.insert(a.code.as_str());
                ordered.push(a.clone());
            }
        }
        if ordered.len() == before {
            return Err(DomainError::validation(
                "template accounts reference unknown or cyclic parents",
            ));
        }
    }
    Ok(ordered)
}

/// Aggregate root: ChartTemplate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTemplate {
    id: ChartTemplateId,
    name: String,
    accounts: Vec<AccountTemplate>,
    version: u64,
    created: bool,
}

impl ChartTemplate {
    pub fn empty(id: ChartTemplateId) -> Self {
        Self {
            id,
            name: String::new(),
            accounts: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accounts in instantiation order (parents first).
    pub fn accounts(&self) -> &[AccountTemplate] {
        &self.accounts
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for ChartTemplate {
    type Id = ChartTemplateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChartTemplate {
    pub scope: CompanyId,
    pub template_id: ChartTemplateId,
    pub name: String,
    pub accounts: Vec<AccountTemplate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartTemplateCommand {
    Create(CreateChartTemplate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTemplateCreated {
    pub scope: CompanyId,
    pub template_id: ChartTemplateId,
    pub name: String,
    pub accounts: Vec<AccountTemplate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartTemplateEvent {
    Created(ChartTemplateCreated),
}

impl Event for ChartTemplateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChartTemplateEvent::Created(_) => "accounting.chart_template.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ChartTemplateEvent::Created(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ChartTemplate {
    type Command = ChartTemplateCommand;
    type Event = ChartTemplateEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ChartTemplateEvent::Created(e) => {
                self.id = e.template_id;
                self.name = e.name.clone();
                self.accounts = e.accounts.clone();
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ChartTemplateCommand::Create(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("chart template already exists"));
                }
                let accounts = plan_accounts(&cmd.accounts)?;
                Ok(vec![ChartTemplateEvent::Created(ChartTemplateCreated {
                    scope: cmd.scope,
                    template_id: cmd.template_id,
                    name: cmd.name.clone(),
                    accounts,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_chart_is_a_valid_tree() {
        let plan = plan_accounts(&minimal_chart()).unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan[0].kind, AccountKind::View);
        assert_eq!(
            plan.iter().filter(|a| a.kind == AccountKind::Receivable).count(),
            1
        );
        assert_eq!(plan.iter().filter(|a| a.kind == AccountKind::Payable).count(), 1);
    }

    #[test]
    fn children_listed_before_parents_are_reordered() {
        let mut accounts = minimal_chart();
        accounts.push(AccountTemplate::leaf("4100", "Shop Sales", AccountKind::Revenue, "4000"));
        accounts.reverse();

        let plan = plan_accounts(&accounts).unwrap();
        let pos = |code: &str| plan.iter().position(|a| a.code == code).unwrap();
        assert!(pos("0") < pos("4000"));
        assert!(pos("4000") < pos("4100"));
    }

    #[test]
    fn two_roots_are_rejected() {
        let mut accounts = minimal_chart();
        accounts.push(AccountTemplate {
            code: "9".to_string(),
            name: "Second root".to_string(),
            kind: AccountKind::View,
            parent_code: None,
        });
        assert!(matches!(plan_accounts(&accounts), Err(DomainError::Validation(_))));
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let mut accounts = minimal_chart();
        accounts.push(AccountTemplate::leaf("7000", "Orphan", AccountKind::Other, "6000"));
        assert!(matches!(plan_accounts(&accounts), Err(DomainError::Validation(_))));
    }
}
