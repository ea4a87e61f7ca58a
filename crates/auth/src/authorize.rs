use std::collections::HashSet;

use thiserror::Error;

use shopkeeper_core::{CompanyId, UserId};

use crate::{Permission, Role};

/// An authenticated user acting within one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub roles: Vec<Role>,
}

/// Who a call runs as. `Root` skips permission checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Privilege {
    Root,
    User(Principal),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("company mismatch")]
    CompanyMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permissions granted by a role. Unknown roles grant nothing.
pub fn role_permissions(role: &Role) -> Vec<Permission> {
    let names: &[&'static str] = match role.as_str() {
        Role::STOCK => &[Permission::STOCK_READ, Permission::STOCK_SHIPMENT_WRITE],
        Role::STOCK_ADMIN => &[
            Permission::STOCK_READ,
            Permission::STOCK_SHIPMENT_WRITE,
            Permission::STOCK_LOCATION_WRITE,
            Permission::PRODUCT_WRITE,
        ],
        Role::STOCK_FORCE_ASSIGNMENT => &[Permission::STOCK_FORCE_ASSIGN],
        Role::ACCOUNT_ADMIN => &[
            Permission::ACCOUNT_READ,
            Permission::ACCOUNT_MOVE_POST,
            Permission::ACCOUNT_CHART_WRITE,
        ],
        _ => &[],
    };
    names.iter().copied().map(Permission::new).collect()
}

pub fn effective_permissions(roles: &[Role]) -> HashSet<Permission> {
    roles.iter().flat_map(role_permissions).collect()
}

/// Authorize `privilege` for `required` within `company_id`.
///
/// No IO, no panics: a pure policy check.
pub fn authorize(
    privilege: &Privilege,
    company_id: CompanyId,
    required: &Permission,
) -> Result<(), AuthzError> {
    let principal = match privilege {
        Privilege::Root => return Ok(()),
        Privilege::User(p) => p,
    };
    if principal.company_id != company_id {
        return Err(AuthzError::CompanyMismatch);
    }
    if effective_permissions(&principal.roles).contains(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
