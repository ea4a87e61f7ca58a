use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use shopkeeper_infra::Session;

use crate::app::{dto, services::AppServices};

pub async fn stock_levels(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Query(query): Query<dto::StockLevelsQuery>,
) -> axum::response::Response {
    match services
        .call(move |shopkeeper| shopkeeper.stock_levels(&session, query.location.as_deref()))
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(response) => response,
    }
}

pub async fn account_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    match services.call(move |shopkeeper| shopkeeper.account_balances(&session)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(response) => response,
    }
}

pub async fn shipments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    match services.call(move |shopkeeper| shopkeeper.shipments(&session)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(response) => response,
    }
}
