//! Service layer
//!
//! Contains business logic separated from HTTP handlers.

mod media;

pub use media::{MediaService, MediaUpload};
