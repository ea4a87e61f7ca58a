//! Argon2id password hashes, stored as PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`).

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("malformed password hash")]
    Malformed,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PasswordHash {
    phc: String,
}

impl PasswordHash {
    /// Hash with a fresh random salt and the default Argon2id parameters.
    pub fn generate(password: &str) -> Result<Self, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
            .to_string();
        Ok(Self { phc })
    }

    pub fn verify(&self, password: &str) -> bool {
        password_hash::PasswordHash::new(&self.phc).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

impl core::fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.phc)
    }
}

impl core::str::FromStr for PasswordHash {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = password_hash::PasswordHash::new(s).map_err(|_| PasswordError::Malformed)?;
        if parsed.algorithm != argon2::Algorithm::Argon2id.ident() {
            return Err(PasswordError::Malformed);
        }
        Ok(Self { phc: s.to_string() })
    }
}

impl TryFrom<String> for PasswordHash {
    type Error = PasswordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PasswordHash> for String {
    fn from(value: PasswordHash) -> Self {
        value.phc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_only_the_right_password() {
        let hash = PasswordHash::generate("s3cret").unwrap();
        assert!(hash.verify("s3cret"));
        assert!(!hash.verify("s3cret "));
        assert!(!hash.verify(""));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(
            PasswordHash::generate("same").unwrap(),
            PasswordHash::generate("same").unwrap()
        );
    }

    #[test]
    fn stored_form_is_a_phc_string_that_parses_back() {
        let stored = PasswordHash::generate("pw").unwrap().to_string();
        assert!(stored.starts_with("$argon2id$v=19$"));

        let parsed: PasswordHash = stored.parse().unwrap();
        assert!(parsed.verify("pw"));
        assert!(!parsed.verify("pw2"));
    }

    #[test]
    fn other_formats_are_malformed() {
        assert_eq!("sha256$00$00".parse::<PasswordHash>(), Err(PasswordError::Malformed));
        assert_eq!("".parse::<PasswordHash>(), Err(PasswordError::Malformed));
        assert_eq!(
            "$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo".parse::<PasswordHash>(),
            Err(PasswordError::Malformed)
        );
    }

    #[test]
    fn serde_round_trips_through_the_phc_string() {
        let hash = PasswordHash::generate("pw").unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert!(json.starts_with("\"$argon2id$"));
        let back: PasswordHash = serde_json::from_str(&json).unwrap();
        assert!(back.verify("pw"));
        assert!(serde_json::from_str::<PasswordHash>("\"plain\"").is_err());
    }
}
