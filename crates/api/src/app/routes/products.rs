use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use shopkeeper_infra::Session;
use shopkeeper_infra::workflows::NewProduct;

use crate::app::{dto, services::AppServices};

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    match services
        .call(move |shopkeeper| shopkeeper.create_product(&session, &body))
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(dto::CreatedResponse { id: id.0.to_string() })).into_response(),
        Err(response) => response,
    }
}
