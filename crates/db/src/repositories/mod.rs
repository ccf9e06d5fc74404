//! Database repositories.
//!
//! Each repository borrows a connection, so the same code runs against the
//! pool or inside a request [`Session`](crate::Session).

mod follow;
mod link;
mod user;

pub use follow::FollowRepository;
pub use link::{LinkRepository, LinkUpsert};
pub use user::{DEFAULT_PAGE_LIMIT, SEARCH_LIMIT, UserLookup, UserLookupKey, UserRepository};
