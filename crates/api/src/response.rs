//! API response types.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cutaway_core::ProfileView;
use cutaway_db::entities::user;
use serde::Serialize;

/// Result envelope of every mutation.
///
/// Errors render the same shape through `AppError`.
#[derive(Debug, Serialize)]
pub struct Status {
    pub success: bool,
    pub message: String,
}

impl Status {
    /// A successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

impl IntoResponse for Status {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Issued access token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    #[must_use]
    pub const fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

/// Registration fields of a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBase {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub google_id: Option<String>,
}

impl From<user::Model> for UserBase {
    fn from(user: user::Model) -> Self {
        Self {
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            google_id: user.google_id,
        }
    }
}

/// A user in search results and rankings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub user_pic: Option<String>,
    pub followers_number: u64,
}

impl UserShort {
    #[must_use]
    pub fn new(user: user::Model, followers_number: u64) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            user_pic: user.user_pic,
            followers_number,
        }
    }
}

/// A full profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFull {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub google_id: Option<String>,
    pub is_active: bool,
    pub about: Option<String>,
    pub phone: Option<String>,
    pub user_pic: Option<String>,
    pub bg_pic: Option<String>,
    pub links: BTreeMap<String, String>,
    pub additional_links: BTreeMap<String, String>,
    pub followers_number: u64,
}

impl From<ProfileView> for UserFull {
    fn from(view: ProfileView) -> Self {
        let user = view.user;
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            google_id: user.google_id,
            is_active: user.is_active,
            about: user.about,
            phone: user.phone,
            user_pic: user.user_pic,
            bg_pic: user.bg_pic,
            links: view.links,
            additional_links: view.additional_links,
            followers_number: view.followers_number,
        }
    }
}
