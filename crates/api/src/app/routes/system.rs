use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use shopkeeper_auth::Privilege;
use shopkeeper_infra::Session;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<Session>) -> impl IntoResponse {
    let (user_id, roles) = match &session.privilege {
        Privilege::User(p) => (
            Some(p.user_id.to_string()),
            p.roles.iter().map(|r| r.as_str().to_string()).collect(),
        ),
        Privilege::Root => (None, Vec::new()),
    };
    Json(serde_json::json!({
        "company_id": session.company_id.to_string(),
        "user_id": user_id,
        "roles": roles,
    }))
}
