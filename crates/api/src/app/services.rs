use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{error, info};

use shopkeeper_infra::{ServiceError, Shopkeeper, ShopkeeperConfig};

use crate::app::errors;
use crate::context::TokenKeys;

pub struct AppServices {
    pub shopkeeper: Shopkeeper,
    pub keys: Arc<TokenKeys>,
}

impl AppServices {
    /// Run a facade call on the blocking pool.
    ///
    /// Writes hold a std mutex for the whole unit of work and signup/login hash
    /// passwords, so neither may run on an async worker.
    pub async fn call<T, F>(self: &Arc<Self>, call: F) -> Result<T, axum::response::Response>
    where
        F: FnOnce(&Shopkeeper) -> Result<T, ServiceError> + Send + 'static,
        T: Send + 'static,
    {
        let services = Arc::clone(self);
        match tokio::task::spawn_blocking(move || call(&services.shopkeeper)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(errors::service_error_to_response(e)),
            Err(e) => {
                error!(error = %e, "blocking facade call failed");
                Err(errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "request could not be completed",
                ))
            }
        }
    }
}

/// In-memory store and bus with the default reference data installed.
pub fn build_services(config: ShopkeeperConfig) -> Result<AppServices, ServiceError> {
    let keys = Arc::new(TokenKeys::hs256(config.jwt_secret.as_bytes()));
    let shopkeeper = Shopkeeper::in_memory(config);

    let report = shopkeeper.install_defaults()?;
    info!(created = report.created, "reference data installed");

    Ok(AppServices { shopkeeper, keys })
}
