//! Model-method style calls: `/rpc/<model>/<method>` with a list of line items.

use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};
use serde_json::Value as JsonValue;

use shopkeeper_infra::Session;
use shopkeeper_infra::workflows::posting::parse_line_items;

use crate::app::services::AppServices;

pub async fn mark_bought(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<JsonValue>,
) -> axum::response::Response {
    let result = services
        .call(move |shopkeeper| {
            let items = parse_line_items(body)?;
            shopkeeper.mark_bought(&session, &items)
        })
        .await;
    match result {
        Ok(_) => Json(JsonValue::Null).into_response(),
        Err(response) => response,
    }
}

pub async fn mark_sold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<JsonValue>,
) -> axum::response::Response {
    let result = services
        .call(move |shopkeeper| {
            let items = parse_line_items(body)?;
            shopkeeper.mark_sold(&session, &items)
        })
        .await;
    match result {
        Ok(_) => Json(JsonValue::Null).into_response(),
        Err(response) => response,
    }
}
