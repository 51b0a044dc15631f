//! Media service
//!
//! Orchestrates uploads and deletions across the storage vault and the
//! media store, separated from the HTTP handlers.

use std::sync::Arc;

use crate::data::{Database, Media, MediaType, NewMedia};
use crate::error::AppError;
use crate::metrics::THUMBNAILS_GENERATED_TOTAL;
use crate::storage::{MediaStorage, thumbnail};

/// MIME prefixes accepted for upload
const ALLOWED_MIME_PREFIXES: [&str; 3] = ["image/", "video/", "audio/"];

/// An upload request, already parsed out of the multipart form
#[derive(Debug)]
pub struct MediaUpload {
    pub data: Vec<u8>,
    pub original_filename: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub playlist_tags: Vec<String>,
    pub owner_id: Option<i64>,
}

pub struct MediaService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl MediaService {
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Store an upload and create its media record.
    ///
    /// # Steps
    /// 1. Write the bytes under a sanitized, collision-safe name
    /// 2. Resolve the MIME type from the stored name; reject anything
    ///    outside image/video/audio and remove the stored file
    /// 3. Generate a thumbnail (soft failure: upload proceeds without)
    /// 4. Insert the record, cleaning up files if the insert fails
    pub async fn upload(&self, upload: MediaUpload) -> Result<Media, AppError> {
        if upload.data.is_empty() {
            return Err(AppError::Validation("media data is required".to_string()));
        }

        let stored = self
            .storage
            .store(&upload.original_filename, &upload.data)
            .await?;

        let mime_type = mime_guess::from_path(&stored.filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        if !ALLOWED_MIME_PREFIXES
            .iter()
            .any(|prefix| mime_type.starts_with(prefix))
        {
            if let Err(error) = self.storage.remove(&stored.filename).await {
                tracing::warn!(filename = %stored.filename, %error, "failed to remove rejected upload");
            }
            return Err(AppError::Validation(
                "Unsupported file type. Only standard image, video, or audio files are allowed."
                    .to_string(),
            ));
        }

        let thumbnail_url = self
            .generate_thumbnail(&stored.filename, upload.data.clone(), &mime_type)
            .await
            .map(|name| format!("/media/{name}"));

        let new = NewMedia {
            filename: stored.filename.clone(),
            original_filename: Some(upload.original_filename),
            media_type: MediaType::from_mime(&mime_type),
            mime_type,
            url: format!("/media/{}", stored.filename),
            thumbnail_url,
            title: upload.title,
            description: upload.description,
            tags: upload.tags,
            playlist_tags: upload.playlist_tags,
            owner_id: upload.owner_id,
        };

        match self.db.create_media(&new).await {
            Ok(media) => Ok(media),
            Err(error) => {
                if let Err(cleanup_error) = self.storage.remove(&stored.filename).await {
                    tracing::warn!(
                        filename = %stored.filename,
                        error = %cleanup_error,
                        "failed to cleanup stored file after record insert error"
                    );
                }
                Err(error)
            }
        }
    }

    /// Delete a media file, its thumbnail, and its record.
    ///
    /// The record delete cascades playlist membership rows; the caller
    /// has already verified the record exists and the actor may mutate it.
    pub async fn delete(&self, filename: &str) -> Result<(), AppError> {
        self.storage.remove(filename).await?;
        self.db.delete_media(filename).await
    }

    /// Run the generator off the async runtime; any failure is swallowed
    async fn generate_thumbnail(
        &self,
        filename: &str,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Option<String> {
        let mime = mime_type.to_string();
        let generated = tokio::task::spawn_blocking(move || thumbnail::generate(&data, &mime))
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "thumbnail generation task failed");
                None
            });

        let Some(bytes) = generated else {
            THUMBNAILS_GENERATED_TOTAL.with_label_values(&["none"]).inc();
            return None;
        };

        match self.storage.store_thumbnail(filename, &bytes).await {
            Ok(name) => {
                THUMBNAILS_GENERATED_TOTAL.with_label_values(&["ok"]).inc();
                Some(name)
            }
            Err(error) => {
                tracing::warn!(filename, %error, "failed to store thumbnail");
                THUMBNAILS_GENERATED_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;
    use tempfile::TempDir;

    async fn create_service() -> (MediaService, Arc<Database>, Arc<MediaStorage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let storage = Arc::new(MediaStorage::new(&temp_dir.path().join("media")).unwrap());
        let service = MediaService::new(db.clone(), storage.clone());
        (service, db, storage, temp_dir)
    }

    fn upload_named(name: &str, data: Vec<u8>) -> MediaUpload {
        MediaUpload {
            data,
            original_filename: name.to_string(),
            title: None,
            description: None,
            tags: Vec::new(),
            playlist_tags: Vec::new(),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn upload_derives_audio_kind_and_placeholder_thumbnail() {
        let (service, _db, storage, _temp_dir) = create_service().await;

        let media = service
            .upload(upload_named("song.mp3", vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(media.media_type, MediaType::Audio);
        assert_eq!(media.mime_type, "audio/mpeg");
        assert_eq!(media.url, "/media/song.mp3");
        assert_eq!(media.thumbnail_url.as_deref(), Some("/media/song.mp3.thumb.jpg"));
        assert!(media.tags.0.is_empty());
        assert!(storage.root().join("song.mp3").exists());
        assert!(storage.root().join("song.mp3.thumb.jpg").exists());
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_type_and_removes_file() {
        let (service, db, storage, _temp_dir) = create_service().await;

        let err = service
            .upload(upload_named("notes.txt", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!storage.root().join("notes.txt").exists());
        assert!(db.list_media().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn video_upload_succeeds_without_thumbnail() {
        let (service, _db, _storage, _temp_dir) = create_service().await;

        let media = service
            .upload(upload_named("clip.mp4", vec![0; 16]))
            .await
            .unwrap();
        assert_eq!(media.media_type, MediaType::Video);
        assert!(media.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn upload_renames_on_filename_collision() {
        let (service, db, _storage, _temp_dir) = create_service().await;

        let first = service
            .upload(upload_named("song.mp3", vec![1]))
            .await
            .unwrap();
        let second = service
            .upload(upload_named("song.mp3", vec![2]))
            .await
            .unwrap();

        assert_eq!(first.filename, "song.mp3");
        assert_ne!(second.filename, first.filename);
        assert!(second.filename.ends_with(".mp3"));
        assert_eq!(db.list_media().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_file_thumbnail_and_record() {
        let (service, db, storage, _temp_dir) = create_service().await;

        let media = service
            .upload(upload_named("song.mp3", vec![1, 2]))
            .await
            .unwrap();
        assert!(storage.root().join(&media.filename).exists());

        service.delete(&media.filename).await.unwrap();

        assert!(!storage.root().join(&media.filename).exists());
        assert!(!storage.root().join("song.mp3.thumb.jpg").exists());
        assert!(db.get_media_by_filename(&media.filename).await.unwrap().is_none());
    }
}
