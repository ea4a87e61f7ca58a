use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopkeeper_core::{CompanyId, UserId};

use crate::Role;

/// JWT claims issued at login.
///
/// `iat`/`exp` are unix seconds so standard JWT libraries can check them too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: UserId,
    pub company_id: CompanyId,
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn issue(
        sub: UserId,
        company_id: CompanyId,
        roles: Vec<Role>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub,
            company_id,
            roles,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Check the claims' time window. Signature verification happens in the API.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(now: DateTime<Utc>, ttl_minutes: i64) -> JwtClaims {
        JwtClaims::issue(
            UserId::new(),
            CompanyId::new(),
            Role::shop_owner(),
            now,
            Duration::minutes(ttl_minutes),
        )
    }

    #[test]
    fn fresh_token_is_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now, 60), now), Ok(()));
    }

    #[test]
    fn expired_and_future_tokens_are_rejected() {
        let now = Utc::now();
        let c = claims(now, 10);
        assert_eq!(
            validate_claims(&c, now + Duration::minutes(10)),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&c, now - Duration::minutes(1)),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(now, 0), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
