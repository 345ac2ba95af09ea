//! SDK-backed blob CRUD.
//!
//! `AzureBlobStorage` is the pass-through [`Storage`] implementation the
//! disk forwards read/write/delete/list calls to. Semantics here are the
//! SDK's; errors are mapped onto the crate taxonomy without being
//! reinterpreted.

use async_trait::async_trait;
use azure_storage_blobs::prelude::ContainerClient;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::debug;

use crate::{Storage, StorageError, StorageMetadata, StorageResult};

/// Blob CRUD over one container.
#[derive(Clone)]
pub struct AzureBlobStorage {
    container: String,
    client: ContainerClient,
}

impl AzureBlobStorage {
    pub fn new(client: ContainerClient, container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            client,
        }
    }

    fn is_not_found(err: &azure_core::Error) -> bool {
        let message = err.to_string();
        message.contains("404")
            || message.contains("BlobNotFound")
            || message.contains("ContainerNotFound")
    }

    fn map_error(path: &str, err: azure_core::Error) -> StorageError {
        if Self::is_not_found(&err) {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Backend(err.to_string())
        }
    }
}

fn to_chrono(stamp: time::OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(stamp.unix_timestamp(), 0)
}

#[async_trait]
impl Storage for AzureBlobStorage {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let blob = self.client.blob_client(path);
        match blob.exists().await {
            Ok(exists) => Ok(exists),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(Self::map_error(path, e)),
        }
    }

    async fn metadata(&self, path: &str) -> StorageResult<StorageMetadata> {
        let blob = self.client.blob_client(path);
        let response = blob
            .get_properties()
            .await
            .map_err(|e| Self::map_error(path, e))?;

        let properties = &response.blob.properties;
        let mut meta = StorageMetadata::file(path, properties.content_length)
            .with_content_type(properties.content_type.clone());
        if let Some(modified) = to_chrono(properties.last_modified) {
            meta = meta.with_modified(modified);
        }
        Ok(meta)
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        debug!(container = %self.container, path, "reading blob");
        let blob = self.client.blob_client(path);
        blob.get_content()
            .await
            .map_err(|e| Self::map_error(path, e))
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        debug!(container = %self.container, path, bytes = data.len(), "writing blob");
        let blob = self.client.blob_client(path);
        blob.put_block_blob(data.to_vec())
            .await
            .map_err(|e| Self::map_error(path, e))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        debug!(container = %self.container, path, "deleting blob");
        let blob = self.client.blob_client(path);
        match blob.delete().await {
            Ok(_) => Ok(()),
            // Deleting a missing blob is a no-op.
            Err(e) if Self::is_not_found(&e) => Ok(()),
            Err(e) => Err(Self::map_error(path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StorageMetadata>> {
        let mut builder = self.client.list_blobs();
        if !prefix.is_empty() {
            builder = builder.prefix(prefix.to_string());
        }

        let mut results = Vec::new();
        let mut stream = builder.into_stream();
        while let Some(page) = stream.next().await {
            let page = page.map_err(|e| Self::map_error(prefix, e))?;
            for blob in page.blobs.blobs() {
                let mut meta =
                    StorageMetadata::file(blob.name.clone(), blob.properties.content_length)
                        .with_content_type(blob.properties.content_type.clone());
                if let Some(modified) = to_chrono(blob.properties.last_modified) {
                    meta = meta.with_modified(modified);
                }
                results.push(meta);
            }
        }
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    async fn create_dir(&self, _path: &str) -> StorageResult<()> {
        // Blob namespaces are flat; directories materialize through key
        // prefixes. Container creation is handled at the service level.
        Ok(())
    }
}
