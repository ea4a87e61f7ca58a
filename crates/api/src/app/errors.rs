use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use shopkeeper_infra::ServiceError;
use shopkeeper_infra::command_dispatcher::DispatchError;
use shopkeeper_infra::lookup::LookupError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::InvalidEmail(e) => json_error(StatusCode::BAD_REQUEST, "invalid_email", e.to_string()),
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::Lookup(e) => lookup_error_to_response(e),
        ServiceError::StateTransition(msg) => json_error(StatusCode::CONFLICT, "invalid_transition", msg),
        ServiceError::Forbidden(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid login or password")
        }
        ServiceError::Dispatch(e) => dispatch_error_to_response(e),
        ServiceError::Projection(e) => {
            error!(error = %e, "read model failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "projection_error", e.to_string())
        }
    }
}

fn lookup_error_to_response(err: LookupError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        LookupError::Missing { .. } | LookupError::Unknown { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", message)
        }
        LookupError::Ambiguous { .. } | LookupError::NotUnique { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "ambiguous_reference", message)
        }
    }
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::InvalidTransition(msg) => json_error(StatusCode::CONFLICT, "invalid_transition", msg),
        DispatchError::Unauthorized => json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized"),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::CompanyIsolation(msg) => json_error(StatusCode::FORBIDDEN, "company_isolation", msg),
        DispatchError::Deserialize(msg) => {
            error!(error = %msg, "stored history unreadable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => {
            error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
