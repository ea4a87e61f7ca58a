//! Service facade: store, bus, read models and configuration behind the
//! library API used by the HTTP layer.
//!
//! Every write call opens one [`UnitOfWork`], runs a workflow, commits, then
//! publishes the committed envelopes and applies them to the read models. The
//! writer lock is held from the first read to the last projection update, so
//! workflows always resolve against a directory that reflects every earlier
//! commit and committed stock cannot be double-allocated.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{error, info};

use shopkeeper_auth::{JwtClaims, Permission};
use shopkeeper_company::SignupRequest;
use shopkeeper_core::CompanyId;
use shopkeeper_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use shopkeeper_products::ProductId;

use crate::config::ShopkeeperConfig;
use crate::error::ServiceError;
use crate::event_store::{EventStore, InMemoryEventStore, StoredEvent, UnitOfWork};
use crate::lookup::ReferenceLookup;
use crate::projections::{AccountBalance, ReadModels, ShipmentSummary, StockLevel};
use crate::session::Session;
use crate::workflows::{
    CommercePoster, CompanyProvisioning, InstallReport, LineItem, NewProduct, PostingReceipt,
    SignupReceipt, authenticate, create_product, install_defaults,
};

pub type Envelope = EventEnvelope<JsonValue>;

pub struct Shopkeeper<S = InMemoryEventStore, B = InMemoryEventBus<Envelope>>
where
    S: EventStore,
    B: EventBus<Envelope>,
{
    store: S,
    bus: B,
    read_models: ReadModels,
    config: ShopkeeperConfig,
    writer: Mutex<()>,
}

impl Shopkeeper {
    /// In-memory store and bus (dev/test and the single-process server).
    pub fn in_memory(config: ShopkeeperConfig) -> Self {
        Self::new(InMemoryEventStore::new(), InMemoryEventBus::new(), config)
    }
}

impl<S, B> Shopkeeper<S, B>
where
    S: EventStore,
    B: EventBus<Envelope>,
{
    pub fn new(store: S, bus: B, config: ShopkeeperConfig) -> Self {
        Self {
            store,
            bus,
            read_models: ReadModels::new(),
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ShopkeeperConfig {
        &self.config
    }

    pub fn read_models(&self) -> &ReadModels {
        &self.read_models
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Committed envelopes, in commit order, from now on.
    pub fn subscribe(&self) -> Subscription<Envelope> {
        self.bus.subscribe()
    }

    pub fn install_defaults(&self) -> Result<InstallReport, ServiceError> {
        let now = Utc::now();
        self.write(|uow| install_defaults(uow, &self.read_models.directory, now))
    }

    pub fn signup(&self, request: &SignupRequest) -> Result<SignupReceipt, ServiceError> {
        let session = Session::root(CompanyId::shared());
        self.write(|uow| CompanyProvisioning::new(&self.read_models, &self.config).signup(uow, &session, request))
    }

    /// Claims for a valid login; the HTTP layer signs them.
    pub fn login(&self, email: &str, password: &str) -> Result<JwtClaims, ServiceError> {
        let uow = UnitOfWork::begin(&self.store);
        authenticate(
            &uow,
            &self.read_models.directory,
            email,
            password,
            Utc::now(),
            self.config.token_ttl,
        )
    }

    pub fn mark_bought(&self, session: &Session, items: &[LineItem]) -> Result<PostingReceipt, ServiceError> {
        self.write(|uow| CommercePoster::new(&self.read_models, &self.config.names).mark_bought(uow, session, items))
    }

    pub fn mark_sold(&self, session: &Session, items: &[LineItem]) -> Result<PostingReceipt, ServiceError> {
        self.write(|uow| CommercePoster::new(&self.read_models, &self.config.names).mark_sold(uow, session, items))
    }

    pub fn create_product(&self, session: &Session, product: &NewProduct) -> Result<ProductId, ServiceError> {
        self.write(|uow| create_product(uow, session, product))
    }

    /// On-hand quantities, optionally restricted to one named location.
    pub fn stock_levels(&self, session: &Session, location: Option<&str>) -> Result<Vec<StockLevel>, ServiceError> {
        session.require(Permission::STOCK_READ)?;
        let levels = &self.read_models.stock_levels;
        let mut rows = match location {
            Some(name) => {
                let location_id = ReferenceLookup::new(&self.read_models.directory, session.company_id).location(name)?;
                levels.at_location(session.company_id, location_id)
            }
            None => levels.list(session.company_id),
        };
        rows.sort_by_key(|r| (r.location_id.0, r.product_id.0));
        Ok(rows)
    }

    pub fn account_balances(&self, session: &Session) -> Result<Vec<AccountBalance>, ServiceError> {
        session.require(Permission::ACCOUNT_READ)?;
        let mut rows = self.read_models.account_balances.list(session.company_id);
        rows.sort_by_key(|r| r.account_id.0);
        Ok(rows)
    }

    pub fn shipments(&self, session: &Session) -> Result<Vec<ShipmentSummary>, ServiceError> {
        session.require(Permission::STOCK_READ)?;
        Ok(self.read_models.shipments.list(session.company_id))
    }

    /// Replay the whole store into fresh read models.
    pub fn rebuild_read_models(&self) -> Result<(), ServiceError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let history = self.store.load_all()?;
        self.read_models
            .rebuild_from_scratch(history.iter().map(StoredEvent::to_envelope))?;
        info!(events = history.len(), "read models rebuilt");
        Ok(())
    }

    /// Run `work` in a fresh unit of work and commit it. On error the unit is
    /// dropped and nothing reaches the store, the bus or the read models.
    fn write<T>(
        &self,
        work: impl FnOnce(&mut UnitOfWork<'_, S>) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut uow = UnitOfWork::begin(&self.store);
        let out = work(&mut uow)?;
        let committed = uow.commit()?;
        info!(events = committed.len(), "unit of work committed");

        self.publish(&committed);
        Ok(out)
    }

    fn publish(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let envelope = stored.to_envelope();
            if let Err(e) = self.read_models.apply_envelope(&envelope) {
                error!(error = %e, event = %stored.event_id, "read model update failed");
            }
            if let Err(e) = self.bus.publish(envelope) {
                error!(error = ?e, event = %stored.event_id, "event publication failed");
            }
        }
    }
}
