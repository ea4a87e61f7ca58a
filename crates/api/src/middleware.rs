use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use crate::app::errors::json_error;
use crate::context::{TokenKeys, session_from_claims};

#[derive(Clone)]
pub struct AuthState {
    pub keys: Arc<TokenKeys>,
}

/// Verify the bearer token and attach the caller's [`shopkeeper_infra::Session`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer token");
    };

    let now = Utc::now();
    let claims = match state.keys.verify(token, now) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "token rejected");
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string());
        }
    };

    req.extensions_mut().insert(session_from_claims(claims, now));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();

    (!token.is_empty()).then_some(token)
}
