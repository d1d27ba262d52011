use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

use super::{MediaStore, MediaStoreError};

/// Media directory on the local filesystem.
pub struct LocalMediaStore {
    base_path: PathBuf,
}

impl LocalMediaStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Only plain relative components are allowed; anything that could escape the root is rejected.
fn validate(path: &str) -> Result<&Path, MediaStoreError> {
    let relative = Path::new(path);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if path.is_empty() || !plain {
        return Err(MediaStoreError::InvalidPath(path.to_string()));
    }
    Ok(relative)
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn exists(&self, path: &str) -> Result<bool, MediaStoreError> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::metadata(&full)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn put_if_absent(&self, path: &str, data: Bytes) -> Result<bool, MediaStoreError> {
        let full = self.resolve(path)?;
        if tokio::fs::try_exists(&full).await? {
            return Ok(false);
        }
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers must never see a partially written file
        let mut partial = full.clone().into_os_string();
        partial.push(format!(".{}.part", uuid::Uuid::new_v4()));
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, &data).await?;

        // Linking fails if the target exists, so exactly one concurrent writer wins
        let linked = match tokio::fs::hard_link(&partial, &full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        };
        tokio::fs::remove_file(&partial).await?;
        Ok(linked?)
    }

    async fn get(&self, path: &str) -> Result<Bytes, MediaStoreError> {
        let full = self.resolve(path)?;
        if !tokio::fs::try_exists(&full).await? {
            return Err(MediaStoreError::NotFound(path.to_string()));
        }
        let data = tokio::fs::read(&full).await?;
        Ok(Bytes::from(data))
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MediaStoreError> {
        Ok(self.base_path.join(validate(path)?))
    }
}
