use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalId(pub AggregateId);

impl JournalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for JournalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    Cash,
    Revenue,
    Expense,
    Stock,
    General,
}

/// Aggregate root: Journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Journal {
    id: JournalId,
    scope: Option<CompanyId>,
    code: String,
    name: String,
    kind: JournalKind,
    version: u64,
    created: bool,
}

impl Journal {
    pub fn empty(id: JournalId) -> Self {
        Self {
            id,
            scope: None,
            code: String::new(),
            name: String::new(),
            kind: JournalKind::General,
            version: 0,
            created: false,
        }
    }

    pub fn scope(&self) -> Option<CompanyId> {
        self.scope
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> JournalKind {
        self.kind
    }
}

impl AggregateRoot for Journal {
    type Id = JournalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJournal {
    pub scope: CompanyId,
    pub journal_id: JournalId,
    pub code: String,
    pub name: String,
    pub kind: JournalKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalCommand {
    CreateJournal(CreateJournal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalCreated {
    pub scope: CompanyId,
    pub journal_id: JournalId,
    pub code: String,
    pub name: String,
    pub kind: JournalKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEvent {
    JournalCreated(JournalCreated),
}

impl Event for JournalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            JournalEvent::JournalCreated(_) => "accounting.journal.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JournalEvent::JournalCreated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Journal {
    type Command = JournalCommand;
    type Event = JournalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            JournalEvent::JournalCreated(e) => {
                self.id = e.journal_id;
                self.scope = Some(e.scope);
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.kind = e.kind;
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            JournalCommand::CreateJournal(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("journal already exists"));
                }
                if cmd.name.trim().is_empty() || cmd.code.trim().is_empty() {
                    return Err(DomainError::validation("journal name and code are required"));
                }
                Ok(vec![JournalEvent::JournalCreated(JournalCreated {
                    scope: cmd.scope,
                    journal_id: cmd.journal_id,
                    code: cmd.code.trim().to_uppercase(),
                    name: cmd.name.trim().to_string(),
                    kind: cmd.kind,
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
    fn journal_code_is_normalised() {
        let id = JournalId::new(AggregateId::new());
        let events = Journal::empty(id)
            .handle(&JournalCommand::CreateJournal(CreateJournal {
                scope: CompanyId::shared(),
                journal_id: id,
                code: "cash".to_string(),
                name: "Cash".to_string(),
                kind: JournalKind::Cash,
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let JournalEvent::JournalCreated(e) = &events[0];
        assert_eq!(e.code, "CASH");
        assert_eq!(e.kind, JournalKind::Cash);
    }

    #[test]
    fn blank_code_is_rejected() {
        let id = JournalId::new(AggregateId::new());
        let err = Journal::empty(id)
            .handle(&JournalCommand::CreateJournal(CreateJournal {
                scope: CompanyId::shared(),
                journal_id: id,
                code: " ".to_string(),
                name: "Cash".to_string(),
                kind: JournalKind::Cash,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
