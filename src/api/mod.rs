//! API layer
//!
//! HTTP handlers for:
//! - Library views
//! - Media upload/serve/mutation
//! - Playlist management
//! - Admin account management
//! - Metrics (Prometheus)

mod admin;
mod dto;
mod library;
mod media;
mod metrics;
mod playlists;

pub use dto::*;

pub use admin::admin_router;
pub use library::library_router;
pub use media::media_router;
pub use metrics::metrics_router;
pub use playlists::playlists_router;
