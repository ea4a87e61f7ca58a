//! Projection implementations (read model builders).
//!
//! Projections consume committed envelopes and build query-optimized read
//! models. All of them are:
//! - **Rebuildable**: reconstructed from the store's commit log
//! - **Company-isolated**: data is partitioned by company scope
//! - **Idempotent**: replays at or below a stream's cursor are ignored

pub mod account_balances;
pub mod cursor;
pub mod directory;
pub mod shipments;
pub mod stock_levels;

use serde_json::Value as JsonValue;
use thiserror::Error;

use shopkeeper_core::CompanyId;
use shopkeeper_events::EventEnvelope;

pub use account_balances::{AccountBalance, AccountBalancesProjection};
pub use cursor::StreamCursors;
pub use directory::{DirectoryProjection, Reference, ReferenceDetail, ReferenceKind};
pub use shipments::{ShipmentDirection, ShipmentSummary, ShipmentsProjection};
pub use stock_levels::{StockLevel, StockLevelsProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event: {0}")]
    Deserialize(String),

    #[error("company isolation violation: {0}")]
    CompanyIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    /// An update arrived for a record the projection never saw created.
    #[error("missing read model record: {0}")]
    MissingRecord(String),

    #[error("read model total overflows: {0}")]
    Overflow(String),
}

/// The event's own company field must agree with the envelope it came in.
pub(crate) fn check_company(
    envelope: &EventEnvelope<JsonValue>,
    event_company: CompanyId,
) -> Result<(), ProjectionError> {
    if envelope.company_id() != event_company {
        return Err(ProjectionError::CompanyIsolation(format!(
            "event company {event_company} does not match envelope company {}",
            envelope.company_id()
        )));
    }
    Ok(())
}

/// Every read model the service answers queries from.
#[derive(Debug, Default)]
pub struct ReadModels {
    pub directory: DirectoryProjection,
    pub stock_levels: StockLevelsProjection,
    pub account_balances: AccountBalancesProjection,
    pub shipments: ShipmentsProjection,
}

impl ReadModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        self.directory.apply_envelope(envelope)?;
        self.stock_levels.apply_envelope(envelope)?;
        self.account_balances.apply_envelope(envelope)?;
        self.shipments.apply_envelope(envelope)?;
        Ok(())
    }

    /// Drop every read model and replay `envelopes` in the order given
    /// (commit order keeps cross-stream lookups such as company names valid).
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.directory.reset();
        self.stock_levels.reset();
        self.account_balances.reset();
        self.shipments.reset();

        for env in envelopes {
            self.apply_envelope(&env)?;
        }
        Ok(())
    }
}
