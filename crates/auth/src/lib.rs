//! `shopkeeper-auth`: users, roles, permissions and token claims.
//!
//! Decoupled from HTTP and storage; JWT encoding lives with the API.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, Principal, Privilege, authorize, effective_permissions, role_permissions};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, PasswordHash};
pub use permissions::Permission;
pub use roles::Role;
pub use user::{CreateUser, User, UserCommand, UserCreated, UserEvent};
