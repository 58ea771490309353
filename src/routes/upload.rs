use std::io;

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    response::Json,
    Extension,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{AssetSlot, StoredAsset, VideoResponse};
use crate::routes::videos::{load_owned_video, parse_video_id};
use crate::services::UploadPolicy;
use crate::state::AppState;

/// Multipart part carrying the thumbnail image.
pub const THUMBNAIL_FIELD: &str = "thumbnail";
/// Multipart part carrying the video file.
pub const VIDEO_FIELD: &str = "video";

/// Streams the first part named `field_name` through intake.
async fn intake_part(
    state: &AppState,
    multipart: &mut Multipart,
    field_name: &str,
    policy: &UploadPolicy,
) -> Result<StoredAsset, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Unable to parse form: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let reader = field_reader(field);
        return Ok(state
            .intake
            .intake(content_type.as_deref(), reader, policy)
            .await?);
    }

    Err(AppError::BadRequest(format!(
        "Unable to parse form file: no '{}' part",
        field_name
    )))
}

fn field_reader(field: Field<'_>) -> impl tokio::io::AsyncRead + Unpin + Send + '_ {
    StreamReader::new(Box::pin(
        field.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
    ))
}

async fn upload_asset(
    state: AppState,
    user: AuthUser,
    raw_video_id: &str,
    mut multipart: Multipart,
    slot: AssetSlot,
) -> Result<Json<VideoResponse>, AppError> {
    let video_id = parse_video_id(raw_video_id)?;
    load_owned_video(
        &state,
        video_id,
        user,
        "You are not allowed to upload content for this video",
    )
    .await?;

    let (field_name, policy) = match slot {
        AssetSlot::Thumbnail => (
            THUMBNAIL_FIELD,
            UploadPolicy::thumbnail(state.config.thumbnail_max_bytes),
        ),
        AssetSlot::Video => (
            VIDEO_FIELD,
            UploadPolicy::video(state.config.video_max_bytes),
        ),
    };

    tracing::info!(video_id = %video_id, user_id = %user.id, field = field_name, "Uploading asset");
    let asset = intake_part(&state, &mut multipart, field_name, &policy).await?;

    let update = match state
        .videos
        .set_asset(video_id, slot, &asset.reference)
        .await
    {
        Ok(update) => update,
        Err(e) => {
            state.intake.discard(&asset.reference).await;
            return Err(e);
        }
    };
    if let Some(previous) = update
        .previous
        .as_ref()
        .filter(|previous| **previous != asset.reference)
    {
        state.intake.discard(previous).await;
    }

    tracing::info!(video_id = %video_id, key = %asset.key, size_bytes = asset.size, "Asset attached");
    Ok(Json(state.resolver.resolve_record(update.record).await?))
}

#[utoipa::path(
    post,
    path = "/api/thumbnail_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Part 'thumbnail': image/jpeg or image/png, at most 10 MiB"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Uploads"
)]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    upload_asset(state, user, &video_id, multipart, AssetSlot::Thumbnail).await
}

#[utoipa::path(
    post,
    path = "/api/video_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Part 'video': video/mp4, at most 1 GiB"),
    responses(
        (status = 200, description = "Video stored", body = VideoResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Video not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Uploads"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    upload_asset(state, user, &video_id, multipart, AssetSlot::Video).await
}
