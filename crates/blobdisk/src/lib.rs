//! Storage abstraction with an Azure Blob Storage backend.
//!
//! Provides a trait-based storage abstraction with implementations for:
//! - Local filesystem storage (development)
//! - Azure Blob Storage (production)
//!
//! The Azure disk wraps the SDK's blob CRUD and adds three behaviors of
//! its own: custom public URL construction, SAS temporary URL signing,
//! and idempotent container creation.
//!
//! ```no_run
//! use blobdisk::{AzureBlobDisk, DiskConfig, Storage, UrlGenerator};
//!
//! # fn main() -> blobdisk::StorageResult<()> {
//! let config = DiskConfig::from_env()?;
//! let disk = AzureBlobDisk::from_config(&config)?;
//! let url = disk.url("uploads/photo.jpg")?;
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod config;
mod error;
mod local;
mod traits;

pub use azure::{
    AccountKeySigner, AzureBlobDisk, AzureBlobService, AzureBlobStorage, BlobService, Expiry,
    SasOptions, SharedAccessSigner, ROOT_CONTAINER,
};
pub use config::{DiskConfig, RetryIncrease, RetryPolicy};
pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
pub use traits::{Storage, StorageMetadata, UrlGenerator};
