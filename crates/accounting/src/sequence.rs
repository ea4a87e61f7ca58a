//! Numbering sequences (e.g. the post-move sequence of a fiscal year).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub AggregateId);

impl SequenceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Code of the sequences used to number posted account moves.
pub const ACCOUNT_MOVE_SEQUENCE_CODE: &str = "account.move";

/// Aggregate root: Sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: SequenceId,
    company_id: Option<CompanyId>,
    name: String,
    code: String,
    prefix: String,
    padding: usize,
    next_number: u64,
    version: u64,
    created: bool,
}

impl Sequence {
    pub fn empty(id: SequenceId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            code: String::new(),
            prefix: String::new(),
            padding: 0,
            next_number: 1,
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    /// Render a number with the sequence prefix and zero padding.
    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.padding)
    }
}

impl AggregateRoot for Sequence {
    type Id = SequenceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSequence {
    pub company_id: CompanyId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub code: String,
    pub prefix: String,
    pub padding: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueNumber (take the next number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueNumber {
    pub company_id: CompanyId,
    pub sequence_id: SequenceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceCommand {
    Create(CreateSequence),
    Issue(IssueNumber),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCreated {
    pub company_id: CompanyId,
    pub sequence_id: SequenceId,
    pub name: String,
    pub code: String,
    pub prefix: String,
    pub padding: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberIssued {
    pub company_id: CompanyId,
    pub sequence_id: SequenceId,
    pub number: u64,
    pub formatted: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceEvent {
    Created(SequenceCreated),
    NumberIssued(NumberIssued),
}

impl Event for SequenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SequenceEvent::Created(_) => "accounting.sequence.created",
            SequenceEvent::NumberIssued(_) => "accounting.sequence.number_issued",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SequenceEvent::Created(e) => e.occurred_at,
            SequenceEvent::NumberIssued(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sequence {
    type Command = SequenceCommand;
    type Event = SequenceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SequenceEvent::Created(e) => {
                self.id = e.sequence_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.code = e.code.clone();
                self.prefix = e.prefix.clone();
                self.padding = e.padding;
                self.next_number = 1;
                self.created = true;
            }
            SequenceEvent::NumberIssued(e) => {
                self.next_number = e.number + 1;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SequenceCommand::Create(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("sequence already exists"));
                }
                if cmd.name.trim().is_empty() || cmd.code.trim().is_empty() {
                    return Err(DomainError::validation("sequence name and code are required"));
                }
                Ok(vec![SequenceEvent::Created(SequenceCreated {
                    company_id: cmd.company_id,
                    sequence_id: cmd.sequence_id,
                    name: cmd.name.trim().to_string(),
                    code: cmd.code.trim().to_string(),
                    prefix: cmd.prefix.clone(),
                    padding: cmd.padding,
                    occurred_at: cmd.occurred_at,
                })])
            }
            SequenceCommand::Issue(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.company_id != Some(cmd.company_id) {
                    return Err(DomainError::invariant("company mismatch"));
                }
                let number = self.next_number;
                Ok(vec![SequenceEvent::NumberIssued(NumberIssued {
                    company_id: cmd.company_id,
                    sequence_id: cmd.sequence_id,
                    number,
                    formatted: self.format(number),
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

    fn created(prefix: &str, padding: usize) -> (Sequence, CompanyId) {
        let company_id = CompanyId::new();
        let id = SequenceId::new(AggregateId::new());
        let mut seq = Sequence::empty(id);
        execute(
            &mut seq,
            &SequenceCommand::Create(CreateSequence {
                company_id,
                sequence_id: id,
                name: "2026".to_string(),
                code: ACCOUNT_MOVE_SEQUENCE_CODE.to_string(),
                prefix: prefix.to_string(),
                padding,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (seq, company_id)
    }

    fn issue(seq: &mut Sequence, company_id: CompanyId) -> NumberIssued {
        let cmd = SequenceCommand::Issue(IssueNumber {
            company_id,
            sequence_id: *seq.id(),
            occurred_at: Utc::now(),
        });
        match execute(seq, &cmd).unwrap().remove(0) {
            SequenceEvent::NumberIssued(e) => e,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn numbers_are_issued_in_order() {
        let (mut seq, company_id) = created("", 0);
        let numbers: Vec<String> = (0..3).map(|_| issue(&mut seq, company_id).formatted).collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
        assert_eq!(seq.next_number(), 4);
    }

    #[test]
    fn prefix_and_padding_are_applied() {
        let (mut seq, company_id) = created("MV/", 4);
        assert_eq!(issue(&mut seq, company_id).formatted, "MV/0001");
    }

    #[test]
    fn issue_from_another_company_is_rejected() {
        let (seq, _) = created("", 0);
        let err = seq
            .handle(&SequenceCommand::Issue(IssueNumber {
                company_id: CompanyId::new(),
                sequence_id: *seq.id(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
