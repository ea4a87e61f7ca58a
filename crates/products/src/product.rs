use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

use crate::uom::Uom;

/// Product identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Goods are stocked and moved between locations; services are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    #[default]
    Goods,
    Service,
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    company_id: Option<CompanyId>,
    name: String,
    kind: ProductKind,
    default_uom: Uom,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            kind: ProductKind::Goods,
            default_uom: Uom::Unit,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProductKind {
        self.kind
    }

    pub fn default_uom(&self) -> Uom {
        self.default_uom
    }

    /// Only goods can appear on a stock move.
    pub fn can_be_moved(&self) -> bool {
        self.created && self.kind == ProductKind::Goods
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    pub default_uom: Uom,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    pub default_uom: Uom,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.kind = e.kind;
                self.default_uom = e.default_uom;
                self.created = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
        }
    }
}

impl Product {
    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            company_id: cmd.company_id,
            product_id: cmd.product_id,
            name: cmd.name.trim().to_string(),
            kind: cmd.kind,
            default_uom: cmd.default_uom,
            occurred_at: cmd.occurred_at,
        })])
    }
}
