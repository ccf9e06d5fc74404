//! API endpoints.

mod auth;
mod files;
mod following;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(following::router())
        .merge(files::router())
}
