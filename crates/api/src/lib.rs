//! HTTP API layer for cutaway.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: registration, tokens, profiles, following, pictures
//! - **Extractors**: Authentication
//! - **Middleware**: Bearer token resolution, shared state
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;

use axum::Router;

use crate::middleware::{AppState, auth_middleware};

/// The API router with authentication applied and state attached.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
