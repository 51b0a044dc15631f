//! Data layer module
//!
//! Handles all persistence:
//! - Account store (users, roles, activation)
//! - Media store (records, tags)
//! - Playlist engine (ordered membership)

mod database;
mod models;

pub use database::Database;
pub use models::*;
