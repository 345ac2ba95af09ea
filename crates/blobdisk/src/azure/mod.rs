//! Azure Blob Storage backend.
//!
//! The disk is a thin decorator: blob CRUD is delegated to the SDK
//! ([`base`]), container creation and canonical URLs go through the
//! narrow [`client::BlobService`] seam, and SAS tokens come from
//! [`sas`]. The disk's own logic is limited to custom public URL
//! construction, temporary URL assembly, and idempotent container
//! creation.

pub mod base;
pub mod client;
pub mod disk;
pub mod sas;

pub use base::AzureBlobStorage;
pub use client::{AzureBlobService, BlobService};
pub use disk::{AzureBlobDisk, ROOT_CONTAINER};
pub use sas::{AccountKeySigner, Expiry, SasOptions, SharedAccessSigner};
