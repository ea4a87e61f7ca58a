use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role (capability group) granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ACCOUNT_ADMIN: &'static str = "account_admin";
    pub const STOCK_ADMIN: &'static str = "stock_admin";
    pub const STOCK_FORCE_ASSIGNMENT: &'static str = "stock_force_assignment";
    pub const STOCK: &'static str = "stock";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Roles granted to the administrator created at signup.
    pub fn shop_owner() -> Vec<Role> {
        [
            Self::ACCOUNT_ADMIN,
            Self::STOCK_ADMIN,
            Self::STOCK_FORCE_ASSIGNMENT,
            Self::STOCK,
        ]
        .into_iter()
        .map(Role::new)
        .collect()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
