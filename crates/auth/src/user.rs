//! User aggregate (event-sourced).
//!
//! Users are created in the shared scope and point at their main company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateRoot, CompanyId, DomainError, UserId};
use shopkeeper_events::Event;

use crate::{PasswordHash, Role};

/// User aggregate.
///
/// # Invariants
/// - the login is a non-empty, lower-cased address and never changes;
/// - the main company is fixed at creation and cannot be the shared scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    login: String,
    name: String,
    password_hash: Option<PasswordHash>,
    main_company: Option<CompanyId>,
    roles: Vec<Role>,
    version: u64,
    created: bool,
}

impl User {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            login: String::new(),
            name: String::new(),
            password_hash: None,
            main_company: None,
            roles: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main_company(&self) -> Option<CompanyId> {
        self.main_company
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(password))
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command to create a user. The password arrives already hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: UserId,
    pub login: String,
    pub name: String,
    pub password_hash: PasswordHash,
    pub main_company: CompanyId,
    pub roles: Vec<Role>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Create(CreateUser),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: UserId,
    pub login: String,
    pub name: String,
    pub password_hash: PasswordHash,
    pub main_company: CompanyId,
    pub roles: Vec<Role>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Created(UserCreated),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "auth.user.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Created(e) => e.occurred_at,
        }
    }
}

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Created(e) => {
                self.id = e.user_id;
                self.login = e.login.clone();
                self.name = e.name.clone();
                self.password_hash = Some(e.password_hash.clone());
                self.main_company = Some(e.main_company);
                self.roles = e.roles.clone();
                self.created = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Create(cmd) => self.handle_create(cmd),
        }
    }
}

impl User {
    fn handle_create(&self, cmd: &CreateUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }
        let login = cmd.login.trim().to_lowercase();
        if login.is_empty() {
            return Err(DomainError::validation("login cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("user name cannot be empty"));
        }
        if cmd.main_company.is_shared() {
            return Err(DomainError::validation("a user needs a main company"));
        }

        let mut roles: Vec<Role> = Vec::with_capacity(cmd.roles.len());
        for role in &cmd.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }

        Ok(vec![UserEvent::Created(UserCreated {
            user_id: cmd.user_id,
            login,
            name: cmd.name.trim().to_string(),
            password_hash: cmd.password_hash.clone(),
            main_company: cmd.main_company,
            roles,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeeper_core::aggregate::execute;

    fn create(user_id: UserId, login: &str, main_company: CompanyId, roles: Vec<Role>) -> UserCommand {
        UserCommand::Create(CreateUser {
            user_id,
            login: login.to_string(),
            name: "Corner Shop".to_string(),
            password_hash: PasswordHash::generate("secret").unwrap(),
            main_company,
            roles,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn created_user_checks_password() {
        let user_id = UserId::new();
        let company_id = CompanyId::new();
        let mut user = User::empty(user_id);
        execute(&mut user, &create(user_id, "Owner@Shop.Example", company_id, Role::shop_owner())).unwrap();

        assert_eq!(user.login(), "owner@shop.example");
        assert_eq!(user.main_company(), Some(company_id));
        assert_eq!(user.roles().len(), 4);
        assert!(user.check_password("secret"));
        assert!(!user.check_password("Secret"));
    }

    #[test]
    fn duplicate_roles_are_collapsed() {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        let roles = vec![Role::new(Role::STOCK), Role::new(Role::STOCK)];
        execute(&mut user, &create(user_id, "a@b.com", CompanyId::new(), roles)).unwrap();
        assert_eq!(user.roles(), &[Role::new(Role::STOCK)]);
    }

    #[test]
    fn user_needs_a_real_company() {
        let user_id = UserId::new();
        let err = User::empty(user_id)
            .handle(&create(user_id, "a@b.com", CompanyId::shared(), vec![]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_user_has_no_password() {
        assert!(!User::empty(UserId::new()).check_password(""));
    }
}
