//! Playlist endpoints
//!
//! CRUD plus ordered membership management. Mutations are gated by the
//! ownership policy: an unowned playlist is mutable by any
//! authenticated user, an owned one only by its owner or an admin.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use super::dto::PlaylistResponse;
use crate::AppState;
use crate::auth::{CurrentUser, can_mutate_playlist};
use crate::data::Playlist;
use crate::error::AppError;

pub fn playlists_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_playlists).post(create_playlist))
        .route(
            "/:id",
            get(get_playlist).put(update_playlist).delete(delete_playlist),
        )
        .route("/:id/items", put(set_items).post(add_item))
        .route("/:id/items/:media_id", axum::routing::delete(remove_item))
}

/// Fetch the playlist row and enforce the mutation policy
async fn mutable_playlist(
    state: &AppState,
    session: &crate::auth::Session,
    id: i64,
) -> Result<Playlist, AppError> {
    let playlist = state
        .db
        .get_playlist_row(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !can_mutate_playlist(session, playlist.owner_id) {
        return Err(AppError::Forbidden);
    }
    Ok(playlist)
}

/// GET /playlists
async fn get_playlists(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
) -> Result<Json<Vec<PlaylistResponse>>, AppError> {
    let playlists = state.db.list_playlists().await?;
    Ok(Json(playlists.iter().map(PlaylistResponse::from).collect()))
}

/// GET /playlists/:id
async fn get_playlist(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<PlaylistResponse>, AppError> {
    let playlist = state.db.get_playlist(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(PlaylistResponse::from(&playlist)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: Option<String>,
}

/// POST /playlists
///
/// The engine itself allows empty names; the boundary rejects them.
async fn create_playlist(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<Json<PlaylistResponse>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    let playlist = state
        .db
        .create_playlist(&req.name, req.description.as_deref(), Some(session.id))
        .await?;
    let resolved = state
        .db
        .get_playlist(playlist.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(PlaylistResponse::from(&resolved)))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// PUT /playlists/:id
async fn update_playlist(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePlaylistRequest>,
) -> Result<Json<PlaylistResponse>, AppError> {
    mutable_playlist(&state, &session, id).await?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
    }

    state
        .db
        .update_playlist(id, req.name.as_deref(), req.description.as_deref())
        .await?;
    let resolved = state.db.get_playlist(id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(PlaylistResponse::from(&resolved)))
}

/// DELETE /playlists/:id
async fn delete_playlist(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    mutable_playlist(&state, &session, id).await?;
    state.db.delete_playlist(id).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct SetItemsRequest {
    pub media_ids: Vec<i64>,
}

/// PUT /playlists/:id/items
///
/// Atomically replaces the entire membership; positions are assigned
/// densely from 0 in input order. Duplicate ids fail the whole call.
async fn set_items(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SetItemsRequest>,
) -> Result<Json<PlaylistResponse>, AppError> {
    mutable_playlist(&state, &session, id).await?;
    let resolved = state.db.set_playlist_items(id, &req.media_ids).await?;
    Ok(Json(PlaylistResponse::from(&resolved)))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub media_id: i64,
    pub position: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub playlist_id: i64,
    pub media_id: i64,
    pub position: i64,
}

/// POST /playlists/:id/items
async fn add_item(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>, AppError> {
    mutable_playlist(&state, &session, id).await?;
    let item = state
        .db
        .add_playlist_item(id, req.media_id, req.position)
        .await?;
    Ok(Json(AddItemResponse {
        playlist_id: item.playlist_id,
        media_id: item.media_id,
        position: item.position,
    }))
}

/// DELETE /playlists/:id/items/:media_id
async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((id, media_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    mutable_playlist(&state, &session, id).await?;
    state.db.remove_playlist_item(id, media_id).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
