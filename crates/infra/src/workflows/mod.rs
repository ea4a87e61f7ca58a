//! Multi-aggregate workflows run inside one unit of work.
//!
//! Each workflow stages commands through a [`CommandDispatcher`] and returns;
//! the caller commits (or drops) the unit. Named references are resolved
//! against the committed directory on every call.
//!
//! [`CommandDispatcher`]: crate::command_dispatcher::CommandDispatcher

pub mod catalog;
pub mod install;
pub mod login;
pub mod posting;
pub mod provisioning;

pub use catalog::{NewProduct, create_product};
pub use install::{InstallReport, install_defaults};
pub use login::authenticate;
pub use posting::{CommercePoster, LineItem, PostingReceipt};
pub use provisioning::{CompanyProvisioning, SignupReceipt};
