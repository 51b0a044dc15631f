//! API response shapes

use serde::Serialize;

use crate::auth::Session;
use crate::data::{Media, PlaylistWithItems, User};
use crate::library::LibraryFilter;

/// A media record as presented to clients
#[derive(Debug, Serialize)]
pub struct MediaItemResponse {
    pub id: i64,
    pub filename: String,
    pub url: String,
    /// The record's MIME type (e.g. "audio/mpeg")
    pub media_type: String,
    /// Broad kind derived from the MIME type
    pub kind: String,
    pub thumbnail: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub playlist_tags: Vec<String>,
    pub original_filename: Option<String>,
    pub uploaded_at: Option<String>,
}

impl From<&Media> for MediaItemResponse {
    fn from(record: &Media) -> Self {
        Self {
            id: record.id,
            filename: record.filename.clone(),
            url: record.url.clone(),
            media_type: record.mime_type.clone(),
            kind: record.media_type.as_str().to_string(),
            thumbnail: record.thumbnail_url.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            tags: record.tags.0.clone(),
            playlist_tags: record.playlist_tags.0.clone(),
            original_filename: record.original_filename.clone(),
            uploaded_at: Some(record.created_at.to_rfc3339()),
        }
    }
}

/// The session snapshot as presented to clients
#[derive(Debug, Serialize)]
pub struct SessionUserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub role: String,
}

impl From<&Session> for SessionUserResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            email: session.email.clone(),
            name: session.name.clone(),
            picture: session.picture.clone(),
            role: session.role.as_str().to_string(),
        }
    }
}

/// An account row as presented to administrators
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub role: String,
    pub active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            role: user.role.as_str().to_string(),
            active: user.active,
        }
    }
}

/// A composed library page
#[derive(Debug, Serialize)]
pub struct LibraryPageResponse {
    pub app_name: String,
    pub title: String,
    pub subtitle: String,
    pub user: SessionUserResponse,
    pub filters: LibraryFilter,
    pub media_items: Vec<MediaItemResponse>,
    pub can_upload: bool,
    pub is_admin: bool,
}

/// One membership entry in a playlist response
#[derive(Debug, Serialize)]
pub struct PlaylistEntryResponse {
    pub position: i64,
    pub media: MediaItemResponse,
}

/// A playlist with its ordered items
#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
    pub created_at: String,
    pub items: Vec<PlaylistEntryResponse>,
}

impl From<&PlaylistWithItems> for PlaylistResponse {
    fn from(resolved: &PlaylistWithItems) -> Self {
        Self {
            id: resolved.playlist.id,
            name: resolved.playlist.name.clone(),
            description: resolved.playlist.description.clone(),
            owner_id: resolved.playlist.owner_id,
            created_at: resolved.playlist.created_at.to_rfc3339(),
            items: resolved
                .items
                .iter()
                .map(|entry| PlaylistEntryResponse {
                    position: entry.position,
                    media: MediaItemResponse::from(&entry.media),
                })
                .collect(),
        }
    }
}

/// Liveness probe payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}
