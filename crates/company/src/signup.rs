use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::email::{EmailError, validate_email};

/// Input of company signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub shop: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignupError {
    #[error("email address is invalid: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("shop name cannot be empty")]
    MissingShop,

    #[error("password cannot be empty")]
    MissingPassword,
}

impl SignupRequest {
    /// Checks run before any record is created.
    pub fn validate(&self) -> Result<(), SignupError> {
        validate_email(self.email.trim())?;
        if self.shop.trim().is_empty() {
            return Err(SignupError::MissingShop);
        }
        if self.password.is_empty() {
            return Err(SignupError::MissingPassword);
        }
        Ok(())
    }

    pub fn login(&self) -> &str {
        self.email.trim()
    }

    pub fn customer_party_name(&self) -> String {
        format!("Customer [{}]", self.login())
    }

    pub fn supplier_party_name(&self) -> String {
        format!("Supplier [{}]", self.login())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(shop: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            shop: shop.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_request_names_its_parties() {
        let req = request("Corner Shop", " owner@corner.example ", "secret");
        assert_eq!(req.validate(), Ok(()));
        assert_eq!(req.customer_party_name(), "Customer [owner@corner.example]");
        assert_eq!(req.supplier_party_name(), "Supplier [owner@corner.example]");
    }

    #[test]
    fn email_is_checked_first() {
        let err = request("", "nope", "").validate().unwrap_err();
        assert_eq!(err, SignupError::InvalidEmail(EmailError::MissingAt));
    }

    #[test]
    fn shop_and_password_are_required() {
        assert_eq!(
            request(" ", "a@b.com", "pw").validate(),
            Err(SignupError::MissingShop)
        );
        assert_eq!(
            request("Shop", "a@b.com", "").validate(),
            Err(SignupError::MissingPassword)
        );
    }
}
