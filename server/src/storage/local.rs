use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{FileStorage, StorageError, Upload};

/// Stores files on the local disk under `{root}/{folder}/`, served back by
/// the router at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, app_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: format!("{}/uploads", app_url.trim_end_matches('/')),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, folder: &str, filename: &str) -> Result<PathBuf, StorageError> {
        let safe = |part: &str| {
            !part.is_empty() && !part.contains(['/', '\\']) && part != "." && part != ".."
        };
        if !safe(folder) || !safe(filename) {
            return Err(StorageError::InvalidName(format!("{folder}/{filename}")));
        }
        Ok(self.root.join(folder).join(filename))
    }
}

fn unique_filename(field: &str, ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{field}-{}-{suffix}.{ext}", Utc::now().timestamp_millis())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, folder: &str, upload: Upload) -> Result<String, StorageError> {
        let ext = upload.extension()?;
        if upload.bytes.is_empty() {
            return Err(StorageError::Empty);
        }

        let filename = unique_filename(&upload.field, ext);
        let path = self.path_for(folder, &filename)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &upload.bytes).await?;

        tracing::debug!(folder, %filename, bytes = upload.bytes.len(), "Stored upload");
        Ok(filename)
    }

    async fn delete(&self, folder: &str, filename: &str) -> Result<(), StorageError> {
        let path = self.path_for(folder, filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(folder, filename, "Stored file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, folder: &str, filename: &str) -> String {
        format!("{}/{folder}/{filename}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::THUMBNAILS;
    use axum::body::Bytes;

    fn png() -> Upload {
        Upload {
            field: "thumbnail".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
        }
    }

    #[tokio::test]
    async fn test_store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://localhost:3001/");

        let filename = storage.store(THUMBNAILS, png()).await.unwrap();
        assert!(filename.starts_with("thumbnail-"));
        assert!(filename.ends_with(".png"));
        assert!(dir.path().join(THUMBNAILS).join(&filename).exists());

        storage.delete(THUMBNAILS, &filename).await.unwrap();
        assert!(!dir.path().join(THUMBNAILS).join(&filename).exists());
        // Second delete is a no-op.
        storage.delete(THUMBNAILS, &filename).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://localhost:3001");

        assert!(matches!(
            storage.delete(THUMBNAILS, "../secret").await,
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_public_url() {
        let storage = LocalFileStorage::new("/tmp/uploads", "http://localhost:3001/");
        assert_eq!(
            storage.public_url(THUMBNAILS, "a.png"),
            "http://localhost:3001/uploads/thumbnails/a.png"
        );
    }
}
