//! The Azure Blob Storage disk.
//!
//! `AzureBlobDisk` decorates an SDK-backed CRUD implementation with the
//! three behaviors that are this crate's own: custom public URL
//! construction, SAS temporary URL generation, and idempotent container
//! creation. Everything else forwards to the wrapped base storage
//! untouched.

use async_trait::async_trait;
use azure_storage_blobs::container::PublicAccess;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::azure::base::AzureBlobStorage;
use crate::azure::client::{AzureBlobService, BlobService};
use crate::azure::sas::{AccountKeySigner, Expiry, SasOptions, SharedAccessSigner};
use crate::config::DiskConfig;
use crate::{
    Storage, StorageError, StorageMetadata, StorageResult, UrlGenerator,
};

/// Reserved container name addressing the account's root storage area.
///
/// Blobs in the root container live directly under the account URL, so
/// public URLs omit the container segment.
pub const ROOT_CONTAINER: &str = "$root";

/// An Azure Blob Storage disk.
///
/// Immutable after construction; construction performs no network calls.
/// Reusable across sequential requests; concurrent use is as safe as the
/// underlying SDK clients make it.
pub struct AzureBlobDisk {
    service: Arc<dyn BlobService>,
    base: Box<dyn Storage>,
    signer: Option<Arc<dyn SharedAccessSigner>>,
    container: String,
    url: Option<Url>,
    prefix: String,
}

impl AzureBlobDisk {
    /// Create a disk over a blob service and a base storage backend.
    pub fn new(
        service: Arc<dyn BlobService>,
        base: Box<dyn Storage>,
        container: impl Into<String>,
    ) -> StorageResult<Self> {
        let container = container.into();
        if container.is_empty() {
            return Err(StorageError::Config(
                "container name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            service,
            base,
            signer: None,
            container,
            url: None,
            prefix: String::new(),
        })
    }

    /// Assemble a production disk from configuration.
    pub fn from_config(config: &DiskConfig) -> StorageResult<Self> {
        let service = Arc::new(AzureBlobService::connect(config)?);
        let base = Box::new(AzureBlobStorage::new(
            service.container_client(&config.container),
            config.container.clone(),
        ));

        let mut disk = Self::new(service, base, config.container.clone())?;
        if let Some(url) = &config.url {
            disk = disk.with_custom_url(url)?;
        }
        if !config.prefix.is_empty() {
            disk = disk.with_prefix(config.prefix.clone());
        }
        if let Some(key) = &config.key {
            disk = disk.with_key(key.clone());
        }
        Ok(disk)
    }

    /// Serve public URLs from a custom base URL (CDN or custom domain).
    ///
    /// Fails with [`StorageError::InvalidCustomUrl`] unless the value is
    /// a well-formed absolute URL.
    pub fn with_custom_url(mut self, url: &str) -> StorageResult<Self> {
        let parsed = Url::parse(url).map_err(|_| StorageError::InvalidCustomUrl {
            url: url.to_string(),
        })?;
        self.url = Some(parsed);
        Ok(self)
    }

    /// Prepend a virtual path segment to every blob key.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable temporary URLs, signing with the given account key.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        let signer = AccountKeySigner::new(self.service.account_name(), key);
        self.with_signer(Arc::new(signer))
    }

    /// Enable temporary URLs with a custom signer.
    pub fn with_signer(mut self, signer: Arc<dyn SharedAccessSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// The container this disk stores blobs in.
    pub fn container(&self) -> &str {
        &self.container
    }

    fn prefixed_path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.prefix.is_empty() {
            path.to_string()
        } else if path.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }

    fn public_url(&self, path: &str) -> String {
        match &self.url {
            Some(base) => {
                let mut out = base.as_str().trim_end_matches('/').to_string();
                if self.container != ROOT_CONTAINER {
                    out.push('/');
                    out.push_str(&self.container);
                }
                out.push('/');
                if !self.prefix.is_empty() {
                    out.push_str(&self.prefix);
                    out.push('/');
                }
                out.push_str(path.trim_start_matches('/'));
                out
            }
            None => self.service.blob_url(&self.container, path),
        }
    }
}

impl UrlGenerator for AzureBlobDisk {
    fn url(&self, path: &str) -> StorageResult<String> {
        Ok(self.public_url(path))
    }

    fn temporary_url(
        &self,
        path: &str,
        expiry: Expiry,
        options: &SasOptions,
    ) -> StorageResult<String> {
        let signer = self.signer.as_ref().ok_or(StorageError::KeyNotSet)?;

        let prefixed = self.prefixed_path(path);
        let resource_name = if prefixed.is_empty() {
            self.container.clone()
        } else {
            format!("{}/{}", self.container, prefixed)
        };

        let token = signer.generate(&options.signed_resource, &resource_name, expiry, options)?;
        Ok(format!("{}?{}", self.public_url(path), token))
    }
}

#[async_trait]
impl Storage for AzureBlobDisk {
    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.base.exists(path).await
    }

    async fn metadata(&self, path: &str) -> StorageResult<StorageMetadata> {
        self.base.metadata(path).await
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.base.read(path).await
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        self.base.write(path, data).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.base.delete(path).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StorageMetadata>> {
        self.base.list(prefix).await
    }

    /// Create a container, treating an existing container as success.
    ///
    /// Containers are created fully public (container and blob read
    /// access); this is a fixed policy, not configurable.
    async fn create_dir(&self, path: &str) -> StorageResult<()> {
        debug!(container = %path, "creating directory");
        match self
            .service
            .create_container(path, PublicAccess::Container)
            .await
        {
            Ok(()) => Ok(()),
            Err(StorageError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(StorageError::DirectoryCreationFailed {
                path: path.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory stand-ins for the SDK collaborators.
    struct StubService {
        account: String,
        /// Containers the service believes already exist.
        existing: Mutex<Vec<String>>,
        /// When set, any create call fails with this backend message.
        fail_with: Option<String>,
    }

    impl StubService {
        fn new() -> Self {
            Self {
                account: "stubaccount".to_string(),
                existing: Mutex::new(Vec::new()),
                fail_with: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl BlobService for StubService {
        fn account_name(&self) -> &str {
            &self.account
        }

        fn blob_url(&self, container: &str, path: &str) -> String {
            format!(
                "https://{}.blob.core.windows.net/{}/{}",
                self.account, container, path
            )
        }

        async fn create_container(
            &self,
            name: &str,
            _access: PublicAccess,
        ) -> StorageResult<()> {
            if let Some(message) = &self.fail_with {
                return Err(StorageError::Backend(message.clone()));
            }
            let mut existing = self.existing.lock().unwrap();
            if existing.iter().any(|c| c == name) {
                return Err(StorageError::AlreadyExists(name.to_string()));
            }
            existing.push(name.to_string());
            Ok(())
        }
    }

    /// Base storage that panics if touched; URL and container tests
    /// must never reach the CRUD surface.
    struct UnreachableStorage;

    #[async_trait]
    impl Storage for UnreachableStorage {
        async fn exists(&self, _: &str) -> StorageResult<bool> {
            unreachable!("base storage should not be called")
        }
        async fn metadata(&self, _: &str) -> StorageResult<StorageMetadata> {
            unreachable!("base storage should not be called")
        }
        async fn read(&self, _: &str) -> StorageResult<Vec<u8>> {
            unreachable!("base storage should not be called")
        }
        async fn write(&self, _: &str, _: &[u8]) -> StorageResult<()> {
            unreachable!("base storage should not be called")
        }
        async fn delete(&self, _: &str) -> StorageResult<()> {
            unreachable!("base storage should not be called")
        }
        async fn list(&self, _: &str) -> StorageResult<Vec<StorageMetadata>> {
            unreachable!("base storage should not be called")
        }
        async fn create_dir(&self, _: &str) -> StorageResult<()> {
            unreachable!("base storage should not be called")
        }
    }

    /// Signer that records the resource name it was asked to sign.
    struct RecordingSigner {
        resources: Mutex<Vec<String>>,
    }

    impl RecordingSigner {
        fn new() -> Self {
            Self {
                resources: Mutex::new(Vec::new()),
            }
        }
    }

    impl SharedAccessSigner for RecordingSigner {
        fn generate(
            &self,
            _signed_resource: &str,
            resource_name: &str,
            _expiry: Expiry,
            _options: &SasOptions,
        ) -> StorageResult<String> {
            self.resources.lock().unwrap().push(resource_name.to_string());
            Ok("sig=stub".to_string())
        }
    }

    fn disk(container: &str) -> AzureBlobDisk {
        AzureBlobDisk::new(
            Arc::new(StubService::new()),
            Box::new(UnreachableStorage),
            container,
        )
        .unwrap()
    }

    #[test]
    fn test_url_with_custom_base() {
        let disk = disk("media")
            .with_custom_url("https://cdn.example.com")
            .unwrap();
        assert_eq!(
            disk.url("uploads/photo.jpg").unwrap(),
            "https://cdn.example.com/media/uploads/photo.jpg"
        );
    }

    #[test]
    fn test_url_strips_slashes() {
        let disk = disk("media")
            .with_custom_url("https://cdn.example.com/")
            .unwrap();
        assert_eq!(
            disk.url("/uploads/photo.jpg").unwrap(),
            "https://cdn.example.com/media/uploads/photo.jpg"
        );
    }

    #[test]
    fn test_url_with_prefix() {
        let disk = disk("media")
            .with_custom_url("https://cdn.example.com")
            .unwrap()
            .with_prefix("tenant-a");
        assert_eq!(
            disk.url("photo.jpg").unwrap(),
            "https://cdn.example.com/media/tenant-a/photo.jpg"
        );
    }

    #[test]
    fn test_url_root_container_omits_container_segment() {
        let disk = disk(ROOT_CONTAINER)
            .with_custom_url("https://cdn.example.com")
            .unwrap();
        assert_eq!(
            disk.url("photo.jpg").unwrap(),
            "https://cdn.example.com/photo.jpg"
        );
    }

    #[test]
    fn test_url_without_custom_base_delegates_to_service() {
        let disk = disk("media");
        assert_eq!(
            disk.url("photo.jpg").unwrap(),
            "https://stubaccount.blob.core.windows.net/media/photo.jpg"
        );
    }

    #[test]
    fn test_invalid_custom_url_rejected() {
        let result = disk("media").with_custom_url("not a url");
        assert!(matches!(
            result,
            Err(StorageError::InvalidCustomUrl { url }) if url == "not a url"
        ));
    }

    #[test]
    fn test_valid_custom_url_accepted() {
        assert!(disk("media").with_custom_url("https://cdn.example.com/assets").is_ok());
    }

    #[test]
    fn test_temporary_url_without_key_fails() {
        let disk = disk("media");
        let result = disk.temporary_url(
            "photo.jpg",
            Expiry::After(Duration::from_secs(600)),
            &SasOptions::default(),
        );
        assert!(matches!(result, Err(StorageError::KeyNotSet)));
    }

    #[test]
    fn test_temporary_url_resource_naming() {
        let signer = Arc::new(RecordingSigner::new());
        let disk = disk("media")
            .with_prefix("tenant-a")
            .with_signer(signer.clone());

        let url = disk
            .temporary_url(
                "photo.jpg",
                Expiry::After(Duration::from_secs(600)),
                &SasOptions::default(),
            )
            .unwrap();
        assert!(url.ends_with("?sig=stub"));

        disk.temporary_url(
            "",
            Expiry::After(Duration::from_secs(600)),
            &SasOptions::default(),
        )
        .unwrap();

        let resources = signer.resources.lock().unwrap();
        assert_eq!(resources[0], "media/tenant-a/photo.jpg");
        // Empty path still signs the prefix, never the bare container.
        assert_eq!(resources[1], "media/tenant-a");
    }

    #[test]
    fn test_temporary_url_empty_path_signs_container() {
        let signer = Arc::new(RecordingSigner::new());
        let disk = disk("media").with_signer(signer.clone());
        disk.temporary_url(
            "",
            Expiry::After(Duration::from_secs(600)),
            &SasOptions::default(),
        )
        .unwrap();
        assert_eq!(signer.resources.lock().unwrap()[0], "media");
    }

    #[test]
    fn test_temporary_url_appends_token_to_public_url() {
        let signer = Arc::new(RecordingSigner::new());
        let disk = disk("media")
            .with_signer(signer)
            .with_custom_url("https://cdn.example.com")
            .unwrap();
        assert_eq!(
            disk.temporary_url(
                "photo.jpg",
                Expiry::After(Duration::from_secs(600)),
                &SasOptions::default(),
            )
            .unwrap(),
            "https://cdn.example.com/media/photo.jpg?sig=stub"
        );
    }

    #[tokio::test]
    async fn test_create_dir_succeeds() {
        let disk = disk("media");
        disk.create_dir("media").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_dir_is_idempotent() {
        let disk = disk("media");
        disk.create_dir("media").await.unwrap();
        // Second call hits the service's "already exists" signal and is
        // swallowed.
        disk.create_dir("media").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_dir_wraps_other_failures() {
        let disk = AzureBlobDisk::new(
            Arc::new(StubService::failing("503 service unavailable")),
            Box::new(UnreachableStorage),
            "media",
        )
        .unwrap();

        let err = disk.create_dir("media").await.unwrap_err();
        match err {
            StorageError::DirectoryCreationFailed { path, message } => {
                assert_eq!(path, "media");
                assert!(message.contains("503 service unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_container_rejected() {
        let result = AzureBlobDisk::new(
            Arc::new(StubService::new()),
            Box::new(UnreachableStorage),
            "",
        );
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
