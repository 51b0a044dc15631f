//! Data models
//!
//! Rust structs representing database entities. Rows use SQLite
//! autoincrement ids and chrono for timestamps; tag lists are stored
//! as JSON columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

// =============================================================================
// Roles and media kinds
// =============================================================================

/// Account role, a closed three-way enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Viewer,
    Uploader,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Uploader => "uploader",
            Self::Admin => "admin",
        }
    }

    /// Parse a role string from a form or API payload
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "uploader" => Some(Self::Uploader),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Broad media kind derived from the MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
}

impl MediaType {
    /// Derive the kind from a MIME type.
    ///
    /// Strict three-way mapping: `video/*` and `image/*` prefixes map to
    /// their kinds, anything else collapses to audio. Unsupported types
    /// are rejected upstream before this runs.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("video/") {
            Self::Video
        } else if mime_type.starts_with("image/") {
            Self::Image
        } else {
            Self::Audio
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Normalize an email to its canonical lookup form.
///
/// Applied at every account-store entry point so differently-cased
/// spellings of one address never produce duplicate rows.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Accounts
// =============================================================================

/// A provisioned account
///
/// Accounts are never hard-deleted; `active` is toggled instead.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Unique natural key, stored lowercase-trimmed
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub role: UserRole,
    pub active: bool,
}

// =============================================================================
// Media
// =============================================================================

/// A stored media file's metadata
///
/// The bytes live under the sandboxed media root; this record holds the
/// storage-relative filename, derived URLs, and organizational tags.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    pub id: i64,
    /// Storage-relative filename, unique within the library
    pub filename: String,
    /// Name the file was uploaded under
    pub original_filename: Option<String>,
    pub media_type: MediaType,
    pub mime_type: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Json<Vec<String>>,
    pub playlist_tags: Json<Vec<String>>,
    /// Weak reference to the uploading account (lookup only, no cascade)
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a new media record
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub original_filename: Option<String>,
    pub media_type: MediaType,
    pub mime_type: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub playlist_tags: Vec<String>,
    pub owner_id: Option<i64>,
}

/// Partial update for a media record; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct MediaChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub playlist_tags: Option<Vec<String>>,
}

// =============================================================================
// Playlists
// =============================================================================

/// A named, ordered collection of media
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: i64,
    /// Trimmed on write; not unique
    pub name: String,
    pub description: Option<String>,
    /// Weak reference to the owning account (lookup only, no cascade)
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Ordered membership row: one media appears at most once per playlist
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaylistItem {
    pub playlist_id: i64,
    pub media_id: i64,
    pub position: i64,
}

/// A membership row with its media record eagerly resolved
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlaylistEntry {
    pub position: i64,
    #[sqlx(flatten)]
    pub media: Media,
}

/// A playlist with its items resolved and ordered by position
#[derive(Debug, Clone)]
pub struct PlaylistWithItems {
    pub playlist: Playlist,
    pub items: Vec<PlaylistEntry>,
}
