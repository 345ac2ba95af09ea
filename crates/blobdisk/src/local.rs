//! Local filesystem storage, used for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::{Storage, StorageError, StorageMetadata, StorageResult};

/// Filesystem-backed [`Storage`] rooted at a base directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path.trim_start_matches('/'))
    }

    fn map_io(path: &str, err: std::io::Error) -> StorageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

fn modified_time(meta: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    let modified = meta.modified().ok()?;
    let since_epoch = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    DateTime::from_timestamp(since_epoch.as_secs() as i64, since_epoch.subsec_nanos())
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.full_path(path).exists())
    }

    async fn metadata(&self, path: &str) -> StorageResult<StorageMetadata> {
        let full_path = self.full_path(path);
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| Self::map_io(path, e))?;

        let mut storage_meta = if meta.is_dir() {
            StorageMetadata::directory(path)
        } else {
            StorageMetadata::file(path, meta.len())
        };
        if let Some(modified) = modified_time(&meta) {
            storage_meta = storage_meta.with_modified(modified);
        }
        Ok(storage_meta)
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        fs::read(self.full_path(path))
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let full_path = self.full_path(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!(path, bytes = data.len(), "writing local file");
        fs::write(&full_path, data)
            .await
            .map_err(|e| Self::map_io(path, e))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        match fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            // Deleting a missing file is a no-op, matching the blob
            // backend's semantics.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StorageMetadata>> {
        let dir = self.full_path(prefix);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix.trim_end_matches('/'), name)
            };
            let meta = entry.metadata().await?;
            let mut storage_meta = if meta.is_dir() {
                StorageMetadata::directory(rel)
            } else {
                StorageMetadata::file(rel, meta.len())
            };
            if let Some(modified) = modified_time(&meta) {
                storage_meta = storage_meta.with_modified(modified);
            }
            results.push(storage_meta);
        }
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    async fn create_dir(&self, path: &str) -> StorageResult<()> {
        fs::create_dir_all(self.full_path(path)).await?;
        Ok(())
    }
}
