//! Minimal blob-service capability.
//!
//! `BlobService` is the narrow seam between the disk and the Azure SDK:
//! account identity, canonical blob URLs, and container creation. The
//! blob CRUD surface lives in [`super::base`]; the disk composes both.

use async_trait::async_trait;
use azure_core::{ExponentialRetryOptions, FixedRetryOptions, RetryOptions, StatusCode};
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::container::PublicAccess;
use azure_storage_blobs::prelude::{BlobServiceClient, ClientBuilder, ContainerClient};
use tracing::debug;

use crate::config::{AuthMode, DiskConfig, RetryIncrease, RetryPolicy};
use crate::{StorageError, StorageResult};

/// Capabilities the disk needs from the blob service.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Storage account name.
    fn account_name(&self) -> &str;

    /// Canonical public URL for a blob.
    fn blob_url(&self, container: &str, path: &str) -> String;

    /// Create a container with the given public access level.
    ///
    /// Fails with [`StorageError::AlreadyExists`] when the service
    /// reports the container as existing.
    async fn create_container(&self, name: &str, access: PublicAccess) -> StorageResult<()>;
}

/// Production [`BlobService`] over the Azure Blob Storage SDK.
#[derive(Clone)]
pub struct AzureBlobService {
    account: String,
    client: BlobServiceClient,
}

impl AzureBlobService {
    /// Build a service client from configuration.
    ///
    /// Resolves the authentication mode, maps the retry policy into the
    /// SDK transport, and honors a custom blob endpoint when one is
    /// configured. No network calls happen here.
    pub fn connect(config: &DiskConfig) -> StorageResult<Self> {
        let (account, credentials) = match config.auth()? {
            AuthMode::AccountKey { account, key } => {
                let credentials = StorageCredentials::access_key(account.clone(), key);
                (account, credentials)
            }
            AuthMode::SasToken { token } => {
                let credentials = StorageCredentials::sas_token(token)
                    .map_err(|e| StorageError::Config(format!("invalid SAS token: {}", e)))?;
                (config.name.clone(), credentials)
            }
        };

        let builder = match config.blob_endpoint()? {
            Some(uri) => {
                debug!(endpoint = %uri, "using custom blob endpoint");
                ClientBuilder::with_location(
                    CloudLocation::Custom {
                        account: account.clone(),
                        uri,
                    },
                    credentials,
                )
            }
            None => ClientBuilder::new(account.clone(), credentials),
        };

        let client = builder
            .retry(retry_options(&config.retry))
            .blob_service_client();

        Ok(Self { account, client })
    }

    /// Client for one container, used to assemble the CRUD backend.
    pub fn container_client(&self, container: &str) -> ContainerClient {
        self.client.container_client(container)
    }
}

/// Map the opaque retry policy onto the SDK's retry middleware.
fn retry_options(policy: &RetryPolicy) -> RetryOptions {
    let delay = std::time::Duration::from_millis(policy.interval_ms);
    match policy.increase {
        RetryIncrease::Linear => {
            RetryOptions::fixed(FixedRetryOptions::default().delay(delay).max_retries(policy.tries))
        }
        RetryIncrease::Exponential => RetryOptions::exponential(
            ExponentialRetryOptions::default()
                .initial_delay(delay)
                .max_retries(policy.tries),
        ),
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn blob_url(&self, container: &str, path: &str) -> String {
        let blob = self.client.container_client(container).blob_client(path);
        match blob.url() {
            Ok(url) => url.to_string(),
            // The SDK only fails here on malformed account endpoints;
            // fall back to the public-cloud canonical form.
            Err(_) => format!(
                "https://{}.blob.core.windows.net/{}/{}",
                self.account, container, path
            ),
        }
    }

    async fn create_container(&self, name: &str, access: PublicAccess) -> StorageResult<()> {
        debug!(container = %name, "creating container");
        self.client
            .container_client(name)
            .create()
            .public_access(access)
            .await
            .map_err(|e| classify_create_error(name, e))
    }
}

/// Classify a container-creation failure.
///
/// A 409 `ContainerAlreadyExists` is the documented existence signal.
/// Azurite and some legacy services have been observed answering 404 for
/// a container that already exists, so 404 counts as existence too.
fn classify_create_error(name: &str, err: azure_core::Error) -> StorageError {
    let already_exists = match err.as_http_error() {
        Some(http) => {
            http.error_code()
                .unwrap_or_default()
                .eq_ignore_ascii_case("ContainerAlreadyExists")
                || http.status() == StatusCode::Conflict
                || http.status() == StatusCode::NotFound
        }
        None => {
            let message = err.to_string();
            message.contains("ContainerAlreadyExists")
                || message.contains("409")
                || message.contains("404")
        }
    };

    if already_exists {
        StorageError::AlreadyExists(name.to_string())
    } else {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> DiskConfig {
        DiskConfig {
            name: "myaccount".to_string(),
            container: "media".to_string(),
            key: Some("a2V5".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_with_account_key() {
        let service = AzureBlobService::connect(&config_with_key()).unwrap();
        assert_eq!(service.account_name(), "myaccount");
    }

    #[test]
    fn test_connect_without_auth_fails() {
        let config = DiskConfig {
            name: "myaccount".to_string(),
            container: "media".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AzureBlobService::connect(&config),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_blob_url_canonical_form() {
        let service = AzureBlobService::connect(&config_with_key()).unwrap();
        let url = service.blob_url("media", "uploads/photo.jpg");
        assert!(url.contains("myaccount"));
        assert!(url.contains("media"));
        assert!(url.contains("uploads/photo.jpg"));
    }
}
