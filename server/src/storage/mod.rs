//! Uploaded images: movie thumbnails and user photos.

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

pub mod local;

pub use local::LocalFileStorage;

pub const THUMBNAILS: &str = "thumbnails";
pub const PHOTOS: &str = "photos";

const ALLOWED_CONTENT_TYPES: [(&str, &str); 3] = [
    ("image/png", "png"),
    ("image/jpeg", "jpeg"),
    ("image/jpg", "jpg"),
];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported file type {0}")]
    UnsupportedType(String),

    #[error("uploaded file is empty")]
    Empty,

    #[error("invalid stored filename '{0}'")]
    InvalidName(String),

    #[error("file storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file part of a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field the file arrived in, used as the stored name prefix.
    pub field: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    /// File extension matching the declared content type, if it is allowed.
    pub fn extension(&self) -> Result<&'static str, StorageError> {
        ALLOWED_CONTENT_TYPES
            .iter()
            .find(|(content_type, _)| content_type.eq_ignore_ascii_case(&self.content_type))
            .map(|(_, ext)| *ext)
            .ok_or_else(|| StorageError::UnsupportedType(self.content_type.clone()))
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists the upload under `folder`, returning the generated filename.
    async fn store(&self, folder: &str, upload: Upload) -> Result<String, StorageError>;
    /// Removes a stored file. Removing a file that is already gone succeeds.
    async fn delete(&self, folder: &str, filename: &str) -> Result<(), StorageError>;
    fn public_url(&self, folder: &str, filename: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str) -> Upload {
        Upload {
            field: "thumbnail".into(),
            content_type: content_type.into(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn test_only_images_are_accepted() {
        assert_eq!(upload("image/png").extension().unwrap(), "png");
        assert_eq!(upload("IMAGE/JPEG").extension().unwrap(), "jpeg");
        assert!(matches!(
            upload("application/pdf").extension(),
            Err(StorageError::UnsupportedType(t)) if t == "application/pdf"
        ));
    }
}
