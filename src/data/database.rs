//! SQLite database operations
//!
//! All database access goes through this module. The wrapper owns the
//! connection pool; multi-step mutations (bulk membership replace,
//! cascading deletes) run inside explicit transactions so partial
//! application is never observable.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite database at `path`.
    ///
    /// Creates the database file if it doesn't exist and runs pending
    /// migrations automatically.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            tracing::error!("Migration failed: {}", e);
            AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
        })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Account store
    // =========================================================================

    /// Look up a user by email (normalized before comparison)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Upsert a user from a resolved identity.
    ///
    /// Refreshes name/picture when the identity supplies values that
    /// differ from the stored ones. Creates a viewer row when the email
    /// is unknown and `create_if_missing` is set; otherwise returns
    /// `None` for unknown emails.
    pub async fn ensure_user(
        &self,
        email: &str,
        name: Option<&str>,
        picture: Option<&str>,
        create_if_missing: bool,
    ) -> Result<Option<User>, AppError> {
        let normalized = normalize_email(email);

        if let Some(user) = self.get_user_by_email(&normalized).await? {
            let new_name = name.filter(|n| user.name.as_deref() != Some(*n));
            let new_picture = picture.filter(|p| user.picture.as_deref() != Some(*p));

            if new_name.is_some() || new_picture.is_some() {
                sqlx::query(
                    "UPDATE users SET name = COALESCE(?, name), picture = COALESCE(?, picture) \
                     WHERE id = ?",
                )
                .bind(new_name)
                .bind(new_picture)
                .bind(user.id)
                .execute(&self.pool)
                .await?;
            }

            return self.get_user_by_id(user.id).await;
        }

        if !create_if_missing {
            return Ok(None);
        }

        let result = sqlx::query(
            "INSERT INTO users (email, name, picture, role, active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&normalized)
        .bind(name)
        .bind(picture)
        .bind(UserRole::Viewer)
        .execute(&self.pool)
        .await?;

        self.get_user_by_id(result.last_insert_rowid()).await
    }

    /// Idempotent provisioning upsert used by admin-driven flows.
    ///
    /// Always flips `active = true`. Returns the user and whether a row
    /// was created.
    pub async fn add_or_activate_user(
        &self,
        email: &str,
        name: Option<&str>,
        role: UserRole,
    ) -> Result<(User, bool), AppError> {
        let normalized = normalize_email(email);

        if let Some(user) = self.get_user_by_email(&normalized).await? {
            sqlx::query("UPDATE users SET active = 1, name = COALESCE(?, name), role = ? WHERE id = ?")
                .bind(name)
                .bind(role)
                .bind(user.id)
                .execute(&self.pool)
                .await?;

            let user = self
                .get_user_by_id(user.id)
                .await?
                .ok_or(AppError::NotFound)?;
            return Ok((user, false));
        }

        let result = sqlx::query("INSERT INTO users (email, name, role, active) VALUES (?, ?, ?, 1)")
            .bind(&normalized)
            .bind(name)
            .bind(role)
            .execute(&self.pool)
            .await?;

        let user = self
            .get_user_by_id(result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((user, true))
    }

    /// Promote the configured emails to active admins at startup
    pub async fn init_admins(&self, emails: &[String]) -> Result<(), AppError> {
        for email in emails {
            if email.trim().is_empty() {
                continue;
            }
            let (user, created) = self
                .add_or_activate_user(email, None, UserRole::Admin)
                .await?;
            tracing::info!(email = %user.email, created, "Admin account provisioned");
        }
        Ok(())
    }

    pub async fn update_user_role(&self, id: i64, role: UserRole) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Media store
    // =========================================================================

    pub async fn create_media(&self, new: &NewMedia) -> Result<Media, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO media (filename, original_filename, media_type, mime_type, url, \
             thumbnail_url, title, description, tags, playlist_tags, owner_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.filename)
        .bind(&new.original_filename)
        .bind(new.media_type)
        .bind(&new.mime_type)
        .bind(&new.url)
        .bind(&new.thumbnail_url)
        .bind(&new.title)
        .bind(&new.description)
        .bind(Json(&new.tags))
        .bind(Json(&new.playlist_tags))
        .bind(new.owner_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_media_by_id(result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_media_by_id(&self, id: i64) -> Result<Option<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(media)
    }

    pub async fn get_media_by_filename(&self, filename: &str) -> Result<Option<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;
        Ok(media)
    }

    /// All media records in upload order
    pub async fn list_media(&self) -> Result<Vec<Media>, AppError> {
        let media = sqlx::query_as::<_, Media>("SELECT * FROM media ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(media)
    }

    /// Apply a partial update to the record with the given filename
    pub async fn update_media(
        &self,
        filename: &str,
        changes: MediaChanges,
    ) -> Result<Media, AppError> {
        let media = self
            .get_media_by_filename(filename)
            .await?
            .ok_or(AppError::NotFound)?;

        let title = changes.title.or(media.title);
        let description = changes.description.or(media.description);
        let tags = changes.tags.map(Json).unwrap_or(media.tags);
        let playlist_tags = changes.playlist_tags.map(Json).unwrap_or(media.playlist_tags);

        sqlx::query(
            "UPDATE media SET title = ?, description = ?, tags = ?, playlist_tags = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&description)
        .bind(&tags)
        .bind(&playlist_tags)
        .bind(media.id)
        .execute(&self.pool)
        .await?;

        self.get_media_by_id(media.id).await?.ok_or(AppError::NotFound)
    }

    /// Delete the record with the given filename.
    ///
    /// Cascades all playlist membership rows referencing the record
    /// inside the same transaction. The backing file is the storage
    /// gateway's concern, not this store's.
    pub async fn delete_media(&self, filename: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id FROM media WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(AppError::NotFound);
        };
        let media_id: i64 = row.get("id");

        sqlx::query("DELETE FROM playlist_items WHERE media_id = ?")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Playlist engine
    // =========================================================================

    pub async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Option<i64>,
    ) -> Result<Playlist, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO playlists (name, description, owner_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name.trim())
        .bind(description)
        .bind(owner_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_playlist_row(result.last_insert_rowid())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// The playlist row alone, without membership
    pub async fn get_playlist_row(&self, id: i64) -> Result<Option<Playlist>, AppError> {
        let playlist = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    pub async fn update_playlist(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Playlist, AppError> {
        let playlist = self.get_playlist_row(id).await?.ok_or(AppError::NotFound)?;

        let name = name.map(str::trim).unwrap_or(&playlist.name);
        let description = match description {
            Some(value) => Some(value),
            None => playlist.description.as_deref(),
        };

        sqlx::query("UPDATE playlists SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.get_playlist_row(id).await?.ok_or(AppError::NotFound)
    }

    /// Delete a playlist, cascading its membership rows in one transaction
    pub async fn delete_playlist(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }

        sqlx::query("DELETE FROM playlist_items WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Atomically replace a playlist's entire membership.
    ///
    /// Clears all existing rows, then inserts one row per id with
    /// position = index (0-based, dense). Duplicate ids in the input hit
    /// the composite primary key; the transaction rolls back and nothing
    /// is applied. Callers de-duplicate upstream.
    pub async fn set_playlist_items(
        &self,
        id: i64,
        media_ids: &[i64],
    ) -> Result<PlaylistWithItems, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }

        sqlx::query("DELETE FROM playlist_items WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (position, media_id) in media_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO playlist_items (playlist_id, media_id, position) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(media_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_playlist(id).await?.ok_or(AppError::NotFound)
    }

    /// Add one media to a playlist.
    ///
    /// Without an explicit position, appends at the current item count.
    /// Existing rows are never renumbered.
    pub async fn add_playlist_item(
        &self,
        id: i64,
        media_id: i64,
        position: Option<i64>,
    ) -> Result<PlaylistItem, AppError> {
        if self.get_playlist_row(id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        if self.get_media_by_id(media_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let position = match position {
            Some(position) => position,
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM playlist_items WHERE playlist_id = ?",
                )
                .bind(id)
                .fetch_one(&self.pool)
                .await?
            }
        };

        sqlx::query("INSERT INTO playlist_items (playlist_id, media_id, position) VALUES (?, ?, ?)")
            .bind(id)
            .bind(media_id)
            .bind(position)
            .execute(&self.pool)
            .await?;

        Ok(PlaylistItem {
            playlist_id: id,
            media_id,
            position,
        })
    }

    /// Remove one membership row; remaining positions keep their gaps
    pub async fn remove_playlist_item(&self, id: i64, media_id: i64) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM playlist_items WHERE playlist_id = ? AND media_id = ?")
                .bind(id)
                .bind(media_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// A playlist with items eagerly resolved, ordered by position ascending
    pub async fn get_playlist(&self, id: i64) -> Result<Option<PlaylistWithItems>, AppError> {
        let Some(playlist) = self.get_playlist_row(id).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PlaylistEntry>(
            "SELECT pi.position AS position, m.* FROM playlist_items pi \
             JOIN media m ON m.id = pi.media_id \
             WHERE pi.playlist_id = ? \
             ORDER BY pi.position ASC, m.id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PlaylistWithItems { playlist, items }))
    }

    pub async fn list_playlists(&self) -> Result<Vec<PlaylistWithItems>, AppError> {
        let playlists = sqlx::query_as::<_, Playlist>("SELECT * FROM playlists ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut resolved = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            let id = playlist.id;
            match self.get_playlist(id).await? {
                Some(with_items) => resolved.push(with_items),
                // Deleted between the two queries; skip.
                None => continue,
            }
        }
        Ok(resolved)
    }
}
