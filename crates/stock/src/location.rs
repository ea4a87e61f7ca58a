use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

/// Stock location identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub AggregateId);

impl LocationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LocationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Location kind.
///
/// Supplier and customer locations are virtual: their on-hand quantity goes
/// negative as goods leave them, which is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Supplier,
    Customer,
    Warehouse,
    Storage,
    LostFound,
}

impl LocationKind {
    pub fn is_virtual(&self) -> bool {
        matches!(self, LocationKind::Supplier | LocationKind::Customer | LocationKind::LostFound)
    }
}

/// Aggregate root: Location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    id: LocationId,
    scope: Option<CompanyId>,
    code: String,
    name: String,
    kind: LocationKind,
    parent: Option<LocationId>,
    version: u64,
    created: bool,
}

impl Location {
    pub fn empty(id: LocationId) -> Self {
        Self {
            id,
            scope: None,
            code: String::new(),
            name: String::new(),
            kind: LocationKind::Storage,
            parent: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LocationId {
        self.id
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

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn parent(&self) -> Option<LocationId> {
        self.parent
    }
}

impl AggregateRoot for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateLocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLocation {
    pub scope: CompanyId,
    pub location_id: LocationId,
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub parent: Option<LocationId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationCommand {
    CreateLocation(CreateLocation),
}

/// Event: LocationCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCreated {
    pub scope: CompanyId,
    pub location_id: LocationId,
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub parent: Option<LocationId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationEvent {
    LocationCreated(LocationCreated),
}

impl Event for LocationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LocationEvent::LocationCreated(_) => "stock.location.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LocationEvent::LocationCreated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Location {
    type Command = LocationCommand;
    type Event = LocationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LocationEvent::LocationCreated(e) => {
                self.id = e.location_id;
                self.scope = Some(e.scope);
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
            LocationCommand::CreateLocation(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("location already exists"));
                }
                if cmd.name.trim().is_empty() || cmd.code.trim().is_empty() {
                    return Err(DomainError::validation("location name and code are required"));
                }
                if cmd.parent == Some(cmd.location_id) {
                    return Err(DomainError::invariant("a location cannot be its own parent"));
                }
                Ok(vec![LocationEvent::LocationCreated(LocationCreated {
                    scope: cmd.scope,
                    location_id: cmd.location_id,
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
