//! Disk configuration.
//!
//! A `DiskConfig` is plain data supplied by the host application, from a
//! TOML settings file or from `AZURE_STORAGE_*` environment variables.
//! Exactly one authentication mode is expected to be active at a time:
//! account key, connection string, or SAS token (plus optional custom
//! endpoint). The retry policy is carried opaquely into the SDK transport
//! and never interpreted here.

use serde::{Deserialize, Serialize};

use crate::{StorageError, StorageResult};

/// How the retry delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryIncrease {
    #[default]
    Linear,
    Exponential,
}

/// Retry policy handed to the SDK transport middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub tries: u32,
    /// Base delay between attempts, in milliseconds.
    pub interval_ms: u64,
    /// Delay growth mode.
    pub increase: RetryIncrease,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 3,
            interval_ms: 1000,
            increase: RetryIncrease::Linear,
        }
    }
}

/// Configuration for one Azure Blob Storage disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Storage account name.
    pub name: String,
    /// Account access key (base64), enables SAS URL generation.
    pub key: Option<String>,
    /// Container holding this disk's blobs.
    pub container: String,
    /// Custom public base URL (CDN or custom domain).
    pub url: Option<String>,
    /// Virtual path segment prepended to every blob key.
    pub prefix: String,
    /// Full connection string, alternative to name/key.
    pub connection_string: Option<String>,
    /// Custom blob endpoint (Azurite, sovereign clouds).
    pub endpoint: Option<String>,
    /// Pre-issued SAS token, alternative to an account key.
    pub sas_token: Option<String>,
    /// Transport retry policy.
    pub retry: RetryPolicy,
}

/// Resolved authentication mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    AccountKey { account: String, key: String },
    SasToken { token: String },
}

impl DiskConfig {
    /// Load from environment variables (`AZURE_STORAGE_ACCOUNT`,
    /// `AZURE_STORAGE_KEY`, `AZURE_STORAGE_CONTAINER`, and friends).
    pub fn from_env() -> StorageResult<Self> {
        let name = std::env::var("AZURE_STORAGE_ACCOUNT")
            .map_err(|_| StorageError::Config("AZURE_STORAGE_ACCOUNT not set".to_string()))?;
        let container = std::env::var("AZURE_STORAGE_CONTAINER")
            .map_err(|_| StorageError::Config("AZURE_STORAGE_CONTAINER not set".to_string()))?;

        Ok(Self {
            name,
            container,
            key: std::env::var("AZURE_STORAGE_KEY").ok(),
            url: std::env::var("AZURE_STORAGE_URL").ok(),
            prefix: std::env::var("AZURE_STORAGE_PREFIX").unwrap_or_default(),
            connection_string: std::env::var("AZURE_STORAGE_CONNECTION_STRING").ok(),
            endpoint: std::env::var("AZURE_STORAGE_ENDPOINT").ok(),
            sas_token: std::env::var("AZURE_STORAGE_SAS_TOKEN").ok(),
            retry: RetryPolicy::default(),
        })
    }

    /// Load from a TOML file.
    pub fn from_file(path: &std::path::Path) -> StorageResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Resolve the active authentication mode.
    ///
    /// Connection strings are flattened into the account-key mode; a
    /// `BlobEndpoint` in the connection string overrides `endpoint`.
    pub fn auth(&self) -> StorageResult<AuthMode> {
        if let Some(conn) = &self.connection_string {
            let parsed = ConnectionString::parse(conn)?;
            return Ok(AuthMode::AccountKey {
                account: parsed.account_name,
                key: parsed.account_key,
            });
        }

        if let Some(key) = &self.key {
            if self.name.is_empty() {
                return Err(StorageError::Config(
                    "account name is required with an account key".to_string(),
                ));
            }
            return Ok(AuthMode::AccountKey {
                account: self.name.clone(),
                key: key.clone(),
            });
        }

        if let Some(sas) = &self.sas_token {
            // Tokens are sometimes pasted with the leading '?' from a
            // browser URL; the SDK wants them bare.
            let token = sas.strip_prefix('?').unwrap_or(sas).to_string();
            return Ok(AuthMode::SasToken { token });
        }

        Err(StorageError::Config(
            "no authentication configured: set key, connection_string, or sas_token".to_string(),
        ))
    }

    /// Effective blob endpoint, if a custom one is configured anywhere.
    pub fn blob_endpoint(&self) -> StorageResult<Option<String>> {
        if let Some(conn) = &self.connection_string {
            let parsed = ConnectionString::parse(conn)?;
            if parsed.blob_endpoint.is_some() {
                return Ok(parsed.blob_endpoint);
            }
        }
        Ok(self.endpoint.clone())
    }
}

/// Parsed `DefaultEndpointsProtocol=...;AccountName=...;AccountKey=...`
/// connection string.
#[derive(Debug, Clone)]
struct ConnectionString {
    account_name: String,
    account_key: String,
    blob_endpoint: Option<String>,
}

impl ConnectionString {
    fn parse(raw: &str) -> StorageResult<Self> {
        let field = |name: &str| {
            raw.split(';')
                .find_map(|part| part.trim().strip_prefix(name))
                .map(|v| v.to_string())
        };

        let account_name = field("AccountName=").ok_or_else(|| {
            StorageError::Config("connection string is missing AccountName".to_string())
        })?;
        let account_key = field("AccountKey=").ok_or_else(|| {
            StorageError::Config("connection string is missing AccountKey".to_string())
        })?;

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint: field("BlobEndpoint="),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> DiskConfig {
        DiskConfig {
            name: "myaccount".to_string(),
            container: "media".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.tries, 3);
        assert_eq!(retry.interval_ms, 1000);
        assert_eq!(retry.increase, RetryIncrease::Linear);
    }

    #[test]
    fn test_auth_account_key() {
        let mut config = base_config();
        config.key = Some("c2VjcmV0".to_string());
        assert_eq!(
            config.auth().unwrap(),
            AuthMode::AccountKey {
                account: "myaccount".to_string(),
                key: "c2VjcmV0".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_connection_string_wins() {
        let mut config = base_config();
        config.key = Some("ignored".to_string());
        config.connection_string = Some(
            "DefaultEndpointsProtocol=https;AccountName=other;AccountKey=a2V5;EndpointSuffix=core.windows.net"
                .to_string(),
        );
        assert_eq!(
            config.auth().unwrap(),
            AuthMode::AccountKey {
                account: "other".to_string(),
                key: "a2V5".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_sas_token_prefix_stripped() {
        let mut config = base_config();
        config.sas_token = Some("?sv=2021-06-08&sig=xxx".to_string());
        assert_eq!(
            config.auth().unwrap(),
            AuthMode::SasToken {
                token: "sv=2021-06-08&sig=xxx".to_string(),
            }
        );
    }

    #[test]
    fn test_auth_missing() {
        let config = base_config();
        assert!(matches!(config.auth(), Err(StorageError::Config(_))));
    }

    #[test]
    fn test_blob_endpoint_from_connection_string() {
        let mut config = base_config();
        config.endpoint = Some("https://example.com".to_string());
        config.connection_string = Some(
            "AccountName=dev;AccountKey=a2V5;BlobEndpoint=http://127.0.0.1:10000/dev".to_string(),
        );
        assert_eq!(
            config.blob_endpoint().unwrap().as_deref(),
            Some("http://127.0.0.1:10000/dev")
        );
    }

    #[test]
    fn test_toml_deserialization() {
        let config: DiskConfig = toml::from_str(
            r#"
            name = "myaccount"
            container = "media"
            prefix = "uploads"

            [retry]
            tries = 5
            increase = "exponential"
            "#,
        )
        .unwrap();
        assert_eq!(config.prefix, "uploads");
        assert_eq!(config.retry.tries, 5);
        assert_eq!(config.retry.interval_ms, 1000);
        assert_eq!(config.retry.increase, RetryIncrease::Exponential);
    }
}
