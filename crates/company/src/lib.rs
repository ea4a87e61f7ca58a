//! Company domain module: companies, currencies and the signup request.
//!
//! Pure domain logic only: no IO, no HTTP, no storage.

pub mod company;
pub mod currency;
pub mod email;
pub mod signup;

pub use company::{
    Company, CompanyCommand, CompanyEvent, CompanyRegistered, ConfigureDefaultAccounts,
    DefaultAccountsConfigured, RegisterCompany,
};
pub use currency::{
    CreateCurrency, Currency, CurrencyCommand, CurrencyCreated, CurrencyEvent, CurrencyId,
    DEFAULT_CURRENCIES,
};
pub use email::{EmailError, validate_email};
pub use signup::{SignupError, SignupRequest};
