use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use shopkeeper_company::SignupRequest;

use crate::app::{dto, errors, services::AppServices};

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SignupRequest>,
) -> axum::response::Response {
    match services.call(move |shopkeeper| shopkeeper.signup(&body)).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(dto::SignupResponse {
                company_id: receipt.company_id,
                user_id: receipt.user_id,
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let claims = match services
        .call(move |shopkeeper| shopkeeper.login(&body.email, &body.password))
        .await
    {
        Ok(c) => c,
        Err(response) => return response,
    };

    match services.keys.sign(&claims) {
        Ok(token) => Json(dto::TokenResponse { token }).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "token signing failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue token")
        }
    }
}
