//! Errors surfaced by the workflows.

use thiserror::Error;

use shopkeeper_auth::AuthzError;
use shopkeeper_company::{EmailError, SignupError};
use shopkeeper_core::DomainError;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStoreError;
use crate::lookup::LookupError;
use crate::projections::ProjectionError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid email address: {0}")]
    InvalidEmail(EmailError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A shipment (or other lifecycle) could not advance.
    #[error("state transition refused: {0}")]
    StateTransition(String),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error(transparent)]
    Dispatch(DispatchError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::InvalidTransition(msg) => ServiceError::StateTransition(msg),
            DispatchError::Validation(msg) => ServiceError::Validation(msg),
            other => ServiceError::Dispatch(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        DispatchError::from(value).into()
    }
}

impl From<EventStoreError> for ServiceError {
    fn from(value: EventStoreError) -> Self {
        DispatchError::from(value).into()
    }
}

impl From<SignupError> for ServiceError {
    fn from(value: SignupError) -> Self {
        match value {
            SignupError::InvalidEmail(e) => ServiceError::InvalidEmail(e),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}
