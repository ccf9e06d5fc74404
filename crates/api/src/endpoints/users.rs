//! Users endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use cutaway_common::AppResult;
use cutaway_core::{AuthService, ProfilePatch, RegisterInput};
use cutaway_db::Session;
use serde::Deserialize;

use crate::{
    extractors::{ApiJson, ApiPath, ApiQuery, AuthUser},
    middleware::AppState,
    response::{Status, UserBase, UserFull, UserShort},
};

/// Default size of the most-followed ranking.
const DEFAULT_TOP_LIMIT: u64 = 5;

/// Pagination query.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Ranking query.
#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<u64>,
}

/// Deletion query.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub passphrase: String,
}

/// List users in registration order.
async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<Json<Vec<UserBase>>> {
    let session = Session::begin(&state.db).await?;
    let users = state
        .profile_service
        .list(&session, query.skip, query.limit)
        .await?;
    session.commit().await?;

    Ok(Json(users.into_iter().map(UserBase::from).collect()))
}

/// Most followed users.
async fn top(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TopQuery>,
) -> AppResult<Json<Vec<UserShort>>> {
    let session = Session::begin(&state.db).await?;
    let ranked = state
        .follow_service
        .top_followed(&session, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await?;
    session.commit().await?;

    Ok(Json(
        ranked
            .into_iter()
            .map(|(user, followers)| UserShort::new(user, followers))
            .collect(),
    ))
}

/// Get current user.
async fn me(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<Json<UserFull>> {
    let session = Session::begin(&state.db).await?;
    let profile = state.profile_service.profile_of(&session, user).await?;
    session.commit().await?;

    Ok(Json(profile.into()))
}

/// Users whose username contains the path segment.
async fn search(
    State(state): State<AppState>,
    ApiPath(pattern): ApiPath<String>,
) -> AppResult<Json<Vec<UserShort>>> {
    let session = Session::begin(&state.db).await?;
    let users = state.profile_service.search(&session, &pattern).await?;
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let counts = state.follow_service.follower_counts(&session, &ids).await?;
    session.commit().await?;

    Ok(Json(
        users
            .into_iter()
            .map(|user| {
                let followers = counts.get(&user.id).copied().unwrap_or(0);
                UserShort::new(user, followers)
            })
            .collect(),
    ))
}

/// Register a new user.
async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> AppResult<Status> {
    let session = Session::begin(&state.db).await?;
    let user = state.profile_service.register(&session, input).await?;
    session.commit().await?;

    Ok(Status::ok(format!("User @{} created", user.username)))
}

/// Full profile of a user.
async fn show(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<Json<UserFull>> {
    let session = Session::begin(&state.db).await?;
    let profile = state.profile_service.get_profile(&session, &username).await?;
    session.commit().await?;

    Ok(Json(profile.into()))
}

/// Edit the caller's own profile.
async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> AppResult<Status> {
    AuthService::ensure_owner(&user, &username)?;

    let session = Session::begin(&state.db).await?;
    state
        .profile_service
        .edit_profile(&session, &username, patch)
        .await?;
    session.commit().await?;

    Ok(Status::ok(format!("User @{username} edited")))
}

/// Delete a user. Guarded by the deletion passphrase, not by a token.
async fn remove(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> AppResult<Status> {
    state.auth_service.check_passphrase(&query.passphrase)?;

    let session = Session::begin(&state.db).await?;
    let pictures = state.profile_service.delete_user(&session, &username).await?;
    session.commit().await?;

    state.profile_service.remove_pictures(pictures).await;

    Ok(Status::ok(format!("User @{username} deleted")))
}

/// Delete one of the caller's links.
async fn remove_link(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiPath((username, link_name)): ApiPath<(String, String)>,
) -> AppResult<Status> {
    AuthService::ensure_owner(&user, &username)?;

    let session = Session::begin(&state.db).await?;
    state
        .profile_service
        .delete_link(&session, &user, &link_name)
        .await?;
    session.commit().await?;

    Ok(Status::ok(format!("{link_name} link of user @{username} deleted")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list).post(create))
        .route("/users/top", get(top))
        .route("/users/me", get(me))
        .route("/users/{pattern}", get(search))
        .route("/user/{username}", get(show).patch(edit).delete(remove))
        .route("/user/{username}/link/{link_name}", delete(remove_link))
}
