use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

/// Party identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The role a party plays for the company that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    /// The legal entity behind a company.
    Company,
    Customer,
    Supplier,
}

/// Aggregate root: Party.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    scope: Option<CompanyId>,
    kind: PartyKind,
    name: String,
    email: Option<String>,
    version: u64,
    created: bool,
}

impl Party {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            scope: None,
            kind: PartyKind::Customer,
            name: String::new(),
            email: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn scope(&self) -> Option<CompanyId> {
        self.scope
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterParty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub scope: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub scope: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub email: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.scope = Some(e.scope);
                self.kind = e.kind;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.created = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
        }
    }
}

impl Party {
    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("party name cannot be empty"));
        }

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            scope: cmd.scope,
            party_id: cmd.party_id,
            kind: cmd.kind,
            name: cmd.name.trim().to_string(),
            email: cmd.email.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeeper_core::aggregate::execute;

    fn register(party_id: PartyId, name: &str) -> PartyCommand {
        PartyCommand::RegisterParty(RegisterParty {
            scope: CompanyId::shared(),
            party_id,
            kind: PartyKind::Supplier,
            name: name.to_string(),
            email: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn register_party_emits_registered_event() {
        let party_id = PartyId::new(AggregateId::new());
        let mut party = Party::empty(party_id);

        let events = execute(&mut party, &register(party_id, " Supplier [a@b.io] ")).unwrap();
        assert_eq!(events.len(), 1);
        assert!(party.is_created());
        assert_eq!(party.name(), "Supplier [a@b.io]");
        assert_eq!(party.kind(), PartyKind::Supplier);
        assert_eq!(party.scope(), Some(CompanyId::shared()));
        assert_eq!(party.version(), 1);
    }

    #[test]
    fn register_party_rejects_empty_name() {
        let party_id = PartyId::new(AggregateId::new());
        let err = Party::empty(party_id).handle(&register(party_id, "   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_party_twice_is_a_conflict() {
        let party_id = PartyId::new(AggregateId::new());
        let mut party = Party::empty(party_id);
        execute(&mut party, &register(party_id, "Acme")).unwrap();

        let err = party.handle(&register(party_id, "Acme")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
