//! Media endpoints
//!
//! Upload, serve, update, and delete. Serving resolves against the
//! sandboxed media root and supports range requests.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower::util::ServiceExt;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeFile;

use super::dto::MediaItemResponse;
use crate::AppState;
use crate::auth::{CurrentUser, UPLOADER_OR_ADMIN, can_mutate_media};
use crate::data::MediaChanges;
use crate::error::AppError;
use crate::metrics::{
    HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL,
};
use crate::service::{MediaService, MediaUpload};

pub fn media_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_media))
        .route(
            "/media/*path",
            get(serve_media).put(update_media).delete(delete_media),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// POST /upload
///
/// Multipart form: file, title?, description?, tags CSV, playlist_tags CSV.
/// Requires the uploader-or-admin role.
async fn upload_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    UPLOADER_OR_ADMIN.authorize(&session)?;

    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/upload"])
        .start_timer();

    let max_bytes = state.config.storage.max_upload_bytes;

    let mut file_data: Option<Vec<u8>> = None;
    let mut original_filename: Option<String> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut playlist_tags: Vec<String> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                original_filename = field.file_name().map(ToString::to_string);

                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
                {
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::Validation(format!(
                            "File too large: exceeds {} bytes",
                            max_bytes
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                file_data = Some(bytes);
            }
            "title" => {
                title = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read title: {}", e))
                })?);
            }
            "description" => {
                description = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read description: {}", e))
                })?);
            }
            "tags" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read tags: {}", e))
                })?;
                tags = split_csv(&raw);
            }
            "playlist_tags" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read playlist tags: {}", e))
                })?;
                playlist_tags = split_csv(&raw);
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or(AppError::Validation("No file provided".to_string()))?;
    let original_filename = original_filename
        .filter(|name| !name.trim().is_empty())
        .ok_or(AppError::Validation(
            "Uploaded file must have a filename".to_string(),
        ))?;

    let service = MediaService::new(state.db.clone(), state.storage.clone());
    let byte_count = file_data.len() as f64;
    let media = service
        .upload(MediaUpload {
            data: file_data,
            original_filename,
            title: title.filter(|value| !value.trim().is_empty()),
            description: description.filter(|value| !value.trim().is_empty()),
            tags,
            playlist_tags,
            owner_id: Some(session.id),
        })
        .await?;

    MEDIA_UPLOADS_TOTAL.inc();
    MEDIA_BYTES_UPLOADED.inc_by(byte_count);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/upload", "200"])
        .inc();

    Ok(Json(serde_json::json!({
        "status": "ok",
        "media_item": MediaItemResponse::from(&media),
    })))
}

/// GET /media/*path
///
/// Requires authentication. The path is resolved against the media
/// root and rejected (404) if it escapes the root or does not exist.
async fn serve_media(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(path): Path<String>,
    request: axum::extract::Request,
) -> Result<Response, AppError> {
    let resolved = state.storage.resolve(&path).await?;

    let response = ServeFile::new(&resolved)
        .oneshot(request)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serve media file: {e}")))?;

    Ok(response.map(axum::body::Body::new))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMediaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub playlist_tags: Option<Vec<String>>,
}

/// PUT /media/:filename
///
/// Requires uploader/admin role or record ownership.
async fn update_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(filename): Path<String>,
    Json(req): Json<UpdateMediaRequest>,
) -> Result<Json<MediaItemResponse>, AppError> {
    let media = state
        .db
        .get_media_by_filename(&filename)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_mutate_media(&session, media.owner_id) {
        return Err(AppError::Forbidden);
    }

    let updated = state
        .db
        .update_media(
            &filename,
            MediaChanges {
                title: req.title,
                description: req.description,
                tags: req.tags,
                playlist_tags: req.playlist_tags,
            },
        )
        .await?;

    Ok(Json(MediaItemResponse::from(&updated)))
}

/// DELETE /media/:filename
///
/// Requires uploader/admin role or record ownership. Removes the
/// backing file, its thumbnail, the record, and all membership rows.
async fn delete_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let media = state
        .db
        .get_media_by_filename(&filename)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_mutate_media(&session, media.owner_id) {
        return Err(AppError::Forbidden);
    }

    let service = MediaService::new(state.db.clone(), state.storage.clone());
    service.delete(&filename).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
