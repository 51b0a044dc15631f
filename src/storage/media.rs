//! Sandboxed media vault
//!
//! Handles byte-level storage under the configured media root: writes
//! with collision renaming, sandboxed path resolution for serving, and
//! deletion of files together with their thumbnails.

use std::path::{Path, PathBuf};

use crate::error::AppError;

/// A stored file's final name and absolute path
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Filesystem storage rooted at the media directory.
///
/// The root is canonicalized at construction; every resolution is
/// checked against it so requests can never escape the sandbox.
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Create the media root if needed and pin its canonical path
    pub fn new(root: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(root)
            .map_err(|e| AppError::Storage(format!("failed to create media root: {e}")))?;
        let root = root
            .canonicalize()
            .map_err(|e| AppError::Storage(format!("failed to resolve media root: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Thumbnail filename convention: `<filename>.thumb.jpg`
    pub fn thumbnail_name(filename: &str) -> String {
        format!("{filename}.thumb.jpg")
    }

    /// Write uploaded bytes under a sanitized version of the original
    /// name, renaming with a short random suffix on collision.
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<StoredFile, AppError> {
        let base = Path::new(original_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
            .replace(['/', '\\'], "_");
        if base.is_empty() {
            return Err(AppError::Validation(
                "Uploaded file must have a filename".to_string(),
            ));
        }

        let mut filename = base.clone();
        let mut destination = self.root.join(&filename);
        if path_exists(&destination).await {
            let stem = Path::new(&base)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("file");
            let extension = Path::new(&base)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default();
            let suffix = short_suffix();
            filename = format!("{stem}-{suffix}{extension}");
            destination = self.root.join(&filename);
        }

        tokio::fs::write(&destination, data)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write media file: {e}")))?;

        Ok(StoredFile {
            filename,
            path: destination,
        })
    }

    /// Write a generated thumbnail next to its media file
    pub async fn store_thumbnail(&self, filename: &str, data: &[u8]) -> Result<String, AppError> {
        let thumb_name = Self::thumbnail_name(filename);
        let destination = self.root.join(&thumb_name);
        tokio::fs::write(&destination, data)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write thumbnail: {e}")))?;
        Ok(thumb_name)
    }

    /// Resolve a storage-relative path for serving.
    ///
    /// Canonicalizes the candidate and rejects (NotFound) anything that
    /// escapes the root, does not exist, or is not a regular file.
    pub async fn resolve(&self, relative: &str) -> Result<PathBuf, AppError> {
        let candidate = self.root.join(relative);
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| AppError::NotFound)?;

        if !resolved.starts_with(&self.root) {
            return Err(AppError::NotFound);
        }

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|_| AppError::NotFound)?;
        if !metadata.is_file() {
            return Err(AppError::NotFound);
        }

        Ok(resolved)
    }

    /// Delete a stored file and its thumbnail.
    ///
    /// Fails NotFound when the backing file is absent; the thumbnail is
    /// removed best-effort either way.
    pub async fn remove(&self, filename: &str) -> Result<(), AppError> {
        let target = self.resolve(filename).await;

        let thumb = self.root.join(Self::thumbnail_name(filename));
        let _ = tokio::fs::remove_file(&thumb).await;

        let target = target?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| AppError::Storage(format!("failed to delete media file: {e}")))?;
        Ok(())
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn short_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
