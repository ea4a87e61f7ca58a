//! Session tokens: HS256 signing and verification of [`JwtClaims`].

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use shopkeeper_auth::{JwtClaims, Principal, TokenValidationError, validate_claims};
use shopkeeper_infra::Session;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or badly signed token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Window(#[from] TokenValidationError),
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn sign(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Verify the signature, then the claims' time window against `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // The window is checked below with our own clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)?.claims;
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

/// Session for the token's user, acting in the token's company.
pub fn session_from_claims(claims: JwtClaims, now: DateTime<Utc>) -> Session {
    Session::for_principal(
        Principal {
            user_id: claims.sub,
            company_id: claims.company_id,
            roles: claims.roles,
        },
        now,
    )
}
