use axum::{
    Router,
    routing::{get, post},
};

pub mod accounts;
pub mod products;
pub mod reports;
pub mod rpc;
pub mod system;

/// Signup and login: no token required.
pub fn public_router() -> Router {
    Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
}

/// Router for all authenticated (company-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/rpc/stock.shipment.in/mark_bought", post(rpc::mark_bought))
        .route("/rpc/stock.shipment.out/mark_sold", post(rpc::mark_sold))
        .route("/products", post(products::create_product))
        .route("/stock/levels", get(reports::stock_levels))
        .route("/ledger/balances", get(reports::account_balances))
        .route("/shipments", get(reports::shipments))
}
