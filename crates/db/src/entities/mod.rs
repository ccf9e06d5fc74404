//! Database entities.

#![allow(missing_docs)]

pub mod follow;
pub mod link;
pub mod user;

pub use follow::Entity as Follow;
pub use link::Entity as Link;
pub use user::Entity as User;
