//! Following endpoints.

use axum::{
    Router,
    extract::State,
    routing::{delete, post},
};
use cutaway_common::{AppError, AppResult};
use cutaway_core::{FollowOutcome, UnfollowOutcome};
use cutaway_db::Session;

use crate::{
    extractors::{ApiPath, AuthUser},
    middleware::AppState,
    response::Status,
};

/// Follow a user.
async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i32>,
) -> AppResult<Status> {
    let session = Session::begin(&state.db).await?;
    let outcome = state
        .follow_service
        .follow(&session, user.id, user_id)
        .await?;
    session.commit().await?;

    match outcome {
        FollowOutcome::Followed => Ok(Status::ok(format!(
            "User {} followed user {user_id}",
            user.id
        ))),
        FollowOutcome::AlreadyFollowing => Err(AppError::Conflict(
            "The user is already being followed".to_string(),
        )),
    }
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i32>,
) -> AppResult<Status> {
    let session = Session::begin(&state.db).await?;
    let outcome = state
        .follow_service
        .unfollow(&session, user.id, user_id)
        .await?;
    session.commit().await?;

    match outcome {
        UnfollowOutcome::Unfollowed => Ok(Status::ok(format!("You unfollowed user {user_id}"))),
        UnfollowOutcome::NotFollowing => Err(AppError::NotFound(
            "The user is not being followed".to_string(),
        )),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/follow/{user_id}", post(follow))
        .route("/user/unfollow/{user_id}", delete(unfollow))
}
