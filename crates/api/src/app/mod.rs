//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the service facade and token keys shared by all handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use shopkeeper_infra::{ServiceError, ShopkeeperConfig};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Reference data is installed before the router is returned.
pub fn build_app(config: ShopkeeperConfig) -> Result<Router, ServiceError> {
    let services = Arc::new(services::build_services(config)?);
    let auth_state = middleware::AuthState {
        keys: services.keys.clone(),
    };

    // Protected routes: the company comes from the bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services))))
}
