//! Media storage module
//!
//! Handles:
//! - File storage under the sandboxed media root
//! - Thumbnail generation

mod media;
pub mod thumbnail;

pub use media::{MediaStorage, StoredFile};
