mod local;

pub use local::LocalMediaStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Media not found: {0}")]
    NotFound(String),
    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}

/// Storage for downloaded audio.
/// Keys are paths relative to the media root, mirroring the remote URL path.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, MediaStoreError>;
    /// Write the file unless it already exists. Returns true if bytes were written.
    async fn put_if_absent(&self, path: &str, data: Bytes) -> Result<bool, MediaStoreError>;
    async fn get(&self, path: &str) -> Result<Bytes, MediaStoreError>;
    /// Absolute location of a stored file, after path validation.
    fn resolve(&self, path: &str) -> Result<PathBuf, MediaStoreError>;
}
