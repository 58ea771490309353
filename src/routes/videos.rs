use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{NewVideo, VideoRecord, VideoResponse};
use crate::services::ownership::authorize;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid ID".to_string()))
}

/// Looks the record up and checks the caller owns it.
pub(crate) async fn load_owned_video(
    state: &AppState,
    video_id: Uuid,
    user: AuthUser,
    denied: &str,
) -> Result<VideoRecord, AppError> {
    let video = state
        .videos
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

    if let Err(e) = authorize(video.user_id, user.id).require(denied) {
        tracing::warn!(video_id = %video_id, user_id = %user.id, "Ownership check failed");
        return Err(e);
    }
    Ok(video)
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Draft video created", body = VideoResponse),
        (status = 400, description = "Title is required"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn create_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let video = state
        .videos
        .create_video(NewVideo {
            user_id: user.id,
            title: title.to_string(),
            description: payload.description,
        })
        .await?;

    tracing::info!(video_id = %video.id, user_id = %user.id, "Video created");
    let response = state.resolver.resolve_record(video).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Caller's videos, newest first", body = [VideoResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let videos = state.videos.list_videos(user.id).await?;

    let mut resolved = Vec::with_capacity(videos.len());
    for video in videos {
        resolved.push(state.resolver.resolve_record(video).await?);
    }
    Ok(Json(resolved))
}

#[utoipa::path(
    get,
    path = "/api/videos/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video with resolved asset URLs", body = VideoResponse),
        (status = 400, description = "Invalid ID"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = load_owned_video(&state, video_id, user, "You can't view this video").await?;

    Ok(Json(state.resolver.resolve_record(video).await?))
}
