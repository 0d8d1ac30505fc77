use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::config::FilesConfig;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Make sure that the file is an image")]
    NotAnImage,

    #[error("No product found with image {0}")]
    NotFound(String),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FileError> for AppError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::NotAnImage | FileError::NotFound(_) => AppError::Validation(e.to_string()),
            FileError::Io(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// A stored image and the public link to it.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub name: String,
    pub secure_url: String,
}

/// Product images on local disk, named `{uuid}.{ext}`.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    dir: PathBuf,
    public_url: String,
}

impl ImageStorage {
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.upload_dir),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn save(&self, extension: &str, bytes: &[u8]) -> Result<StoredImage, FileError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        tracing::debug!(name = %name, size = bytes.len(), "Image stored");
        Ok(StoredImage {
            secure_url: format!("{}/api/v1/files/product/{}", self.public_url, name),
            name,
        })
    }

    /// Path of an existing image. Names that could leave the upload
    /// directory are treated as missing.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, FileError> {
        let not_found = || FileError::NotFound(name.to_string());

        if name.is_empty() || name.contains(&['/', '\\'][..]) || name.contains("..") {
            return Err(not_found());
        }

        let path = self.dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(not_found()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }
}
