//! Explicit call context: active company, acting privilege and clock.

use chrono::{DateTime, NaiveDate, Utc};

use shopkeeper_auth::{Permission, Principal, Privilege, authorize};
use shopkeeper_core::CompanyId;

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub company_id: CompanyId,
    pub privilege: Privilege,
    pub now: DateTime<Utc>,
}

impl Session {
    /// A user acting in their own company.
    pub fn for_principal(principal: Principal, now: DateTime<Utc>) -> Self {
        Self {
            company_id: principal.company_id,
            privilege: Privilege::User(principal),
            now,
        }
    }

    /// Elevated context scoped to `company_id`; permission checks pass.
    pub fn root(company_id: CompanyId) -> Self {
        Self {
            company_id,
            privilege: Privilege::Root,
            now: Utc::now(),
        }
    }

    /// Same session with a fixed clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Root privilege over another scope, keeping the clock.
    pub fn elevate_to(&self, company_id: CompanyId) -> Self {
        Self {
            company_id,
            privilege: Privilege::Root,
            now: self.now,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn require(&self, permission: &'static str) -> Result<(), ServiceError> {
        authorize(&self.privilege, self.company_id, &Permission::new(permission))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeeper_auth::Role;
    use shopkeeper_core::UserId;

    #[test]
    fn stock_clerk_cannot_post_account_moves() {
        let session = Session::for_principal(
            Principal {
                user_id: UserId::new(),
                company_id: CompanyId::new(),
                roles: vec![Role::new(Role::STOCK)],
            },
            Utc::now(),
        );
        assert!(session.require(Permission::STOCK_SHIPMENT_WRITE).is_ok());
        assert!(matches!(
            session.require(Permission::ACCOUNT_MOVE_POST),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(session.elevate_to(session.company_id).require(Permission::ACCOUNT_MOVE_POST).is_ok());
    }
}
