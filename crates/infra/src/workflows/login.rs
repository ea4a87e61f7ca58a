use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use shopkeeper_auth::{JwtClaims, User};
use shopkeeper_core::{CompanyId, UserId};

use crate::command_dispatcher::CommandDispatcher;
use crate::error::ServiceError;
use crate::projections::DirectoryProjection;

/// Check a login/password pair and issue session claims for the user's main
/// company. Unknown logins and wrong passwords fail the same way.
pub fn authenticate<D: CommandDispatcher>(
    uow: &D,
    directory: &DirectoryProjection,
    login: &str,
    password: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<JwtClaims, ServiceError> {
    let Some(record) = directory.find_login(login) else {
        warn!("login attempt for unknown user");
        return Err(ServiceError::InvalidCredentials);
    };

    let user_id = UserId::from_uuid(*record.id.as_uuid());
    let user: User = uow.load(CompanyId::shared(), user_id)?;
    if !user.check_password(password) {
        warn!(user = %user_id, "login attempt with wrong password");
        return Err(ServiceError::InvalidCredentials);
    }
    let company_id = user.main_company().ok_or(ServiceError::InvalidCredentials)?;

    Ok(JwtClaims::issue(user_id, company_id, user.roles().to_vec(), now, ttl))
}
