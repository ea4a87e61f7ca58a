//! Configuration module
//!
//! Loads configuration from environment variables (a `.env` file is honoured
//! by the binary through `dotenvy`).

use std::env;

use chrono::Duration;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Names of the reference records the posting workflows resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNames {
    pub cash_journal: String,
    pub revenue_account: String,
    pub payable_account: String,
    pub receivable_account: String,
    pub supplier_location: String,
    pub customer_location: String,
    pub input_zone: String,
    pub output_zone: String,
    pub storage_zone: String,
}

impl Default for ReferenceNames {
    fn default() -> Self {
        Self {
            cash_journal: "Cash".to_string(),
            revenue_account: "Main Revenue".to_string(),
            payable_account: "Main Payable".to_string(),
            receivable_account: "Main Receivable".to_string(),
            supplier_location: "Supplier".to_string(),
            customer_location: "Customer".to_string(),
            input_zone: "Input Zone".to_string(),
            output_zone: "Output Zone".to_string(),
            storage_zone: "Storage Zone".to_string(),
        }
    }
}

impl ReferenceNames {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            cash_journal: var_or("SHOPKEEPER_CASH_JOURNAL", d.cash_journal),
            revenue_account: var_or("SHOPKEEPER_REVENUE_ACCOUNT", d.revenue_account),
            payable_account: var_or("SHOPKEEPER_PAYABLE_ACCOUNT", d.payable_account),
            receivable_account: var_or("SHOPKEEPER_RECEIVABLE_ACCOUNT", d.receivable_account),
            supplier_location: var_or("SHOPKEEPER_SUPPLIER_LOCATION", d.supplier_location),
            customer_location: var_or("SHOPKEEPER_CUSTOMER_LOCATION", d.customer_location),
            input_zone: var_or("SHOPKEEPER_INPUT_ZONE", d.input_zone),
            output_zone: var_or("SHOPKEEPER_OUTPUT_ZONE", d.output_zone),
            storage_zone: var_or("SHOPKEEPER_STORAGE_ZONE", d.storage_zone),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct ShopkeeperConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,

    /// HS256 signing secret for session tokens
    pub jwt_secret: String,

    /// ISO code of the currency new companies are registered with
    pub default_currency: String,

    /// Lifetime of issued session tokens
    pub token_ttl: Duration,

    pub names: ReferenceNames,
}

impl Default for ShopkeeperConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            default_currency: "INR".to_string(),
            token_ttl: Duration::minutes(60),
            names: ReferenceNames::default(),
        }
    }
}

impl ShopkeeperConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = var_or("SHOPKEEPER_BIND", "0.0.0.0:8080".to_string());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        if jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue("JWT_SECRET"));
        }

        let default_currency = var_or("SHOPKEEPER_CURRENCY", "INR".to_string())
            .trim()
            .to_uppercase();
        if default_currency.len() != 3 || !default_currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidValue("SHOPKEEPER_CURRENCY"));
        }

        let ttl_minutes: i64 = env::var("SHOPKEEPER_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SHOPKEEPER_TOKEN_TTL_MINUTES"))?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue("SHOPKEEPER_TOKEN_TTL_MINUTES"));
        }

        Ok(Self {
            bind_addr,
            jwt_secret,
            default_currency,
            token_ttl: Duration::minutes(ttl_minutes),
            names: ReferenceNames::from_env(),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn var_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_installed_records() {
        let config = ShopkeeperConfig::default();
        assert_eq!(config.default_currency, "INR");
        assert_eq!(config.names.cash_journal, "Cash");
        assert_eq!(config.names.storage_zone, "Storage Zone");
        assert!(config.uses_dev_secret());
    }
}
