//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cutaway_common::{AppError, Config, StorageBackend};
use cutaway_core::{
    AuthService, FollowService, ImageProcessor, ImageService, JwtTokenService, ProfileService,
};
use cutaway_db::Session;
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub follow_service: FollowService,
}

impl AppState {
    /// Wire the services on top of a database pool and a picture store.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &Config, storage: Arc<dyn StorageBackend>) -> Self {
        let tokens = Arc::new(JwtTokenService::new(&config.auth.jwt_secret));
        let images: Arc<dyn ImageProcessor> = Arc::new(ImageService::new(storage));

        Self {
            db: Arc::new(db),
            auth_service: AuthService::new(tokens, &config.auth),
            profile_service: ProfileService::new(images),
            follow_service: FollowService::new(),
        }
    }
}

/// Bearer token of a request, if it carries one.
fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware.
///
/// Resolves the bearer token to a user and stores it in the request
/// extensions. Invalid tokens are ignored here; routes that need a user
/// reject the request through the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req).map(ToOwned::to_owned) {
        let user = async {
            let session = Session::begin(&state.db).await?;
            let user = state.auth_service.authenticate(&session, &token).await?;
            session.commit().await?;
            Ok::<_, AppError>(user)
        }
        .await;

        match user {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(AppError::Unauthorized(_)) => {}
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}
