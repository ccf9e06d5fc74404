//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use cutaway_common::AppResult;
use cutaway_db::Session;
use serde::Deserialize;

use crate::{extractors::ApiJson, middleware::AppState, response::TokenResponse};

/// Token request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    /// Identity provider proof for `email`.
    #[serde(alias = "googleAuth", alias = "google_auth")]
    pub proof: String,
}

/// Exchange an email and identity proof for a bearer token.
async fn token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let session = Session::begin(&state.db).await?;
    let access_token = state
        .auth_service
        .issue_token(&session, &req.email, &req.proof)
        .await?;
    session.commit().await?;

    Ok(Json(TokenResponse::bearer(access_token)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/token", post(token))
}
