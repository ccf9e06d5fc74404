//! Picture upload endpoint.

use axum::{
    Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    routing::post,
};
use cutaway_common::{AppError, AppResult};
use cutaway_core::PictureKind;
use cutaway_db::Session;
use serde::Deserialize;

use crate::{
    extractors::{ApiQuery, AuthUser},
    middleware::AppState,
    response::Status,
};

/// Upload query.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "picType", alias = "pic_type")]
    pub pic_type: Option<String>,
}

/// Read the `file` part of a multipart body.
async fn read_file(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// Replace the avatar or background picture of the caller.
async fn upload(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Status> {
    let kind: PictureKind = query.pic_type.as_deref().unwrap_or_default().parse()?;
    let data = read_file(multipart?).await?;

    let session = Session::begin(&state.db).await?;
    let upload = state
        .profile_service
        .upload_picture(&session, &user, kind, data)
        .await?;

    if let Err(e) = session.commit().await {
        state.profile_service.remove_pictures([upload.stored]).await;
        return Err(e);
    }
    state.profile_service.remove_pictures(upload.replaced).await;

    Ok(Status::ok(format!("{} changed successfully", kind.label())))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/files", post(upload))
}
