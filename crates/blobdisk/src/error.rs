//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File or blob not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Container (or local directory) already exists.
    ///
    /// Raised by the client layer when container creation hits an
    /// existing container; `create_dir` swallows it, so callers of the
    /// disk never observe this variant from directory creation.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Configured custom base URL is not a valid absolute URL.
    #[error("invalid custom storage URL: {url}")]
    InvalidCustomUrl { url: String },

    /// A temporary URL was requested but no account key is configured.
    #[error("an account key is required to create temporary URLs")]
    KeyNotSet,

    /// Container creation failed for a reason other than existence.
    #[error("unable to create directory {path}: {message}")]
    DirectoryCreationFailed { path: String, message: String },

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error, passed through from the SDK unmodified.
    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound("file.txt".to_string());
        assert_eq!(err.to_string(), "not found: file.txt");

        let err = StorageError::InvalidCustomUrl {
            url: "not a url".to_string(),
        };
        assert_eq!(err.to_string(), "invalid custom storage URL: not a url");
    }

    #[test]
    fn test_directory_creation_failed_carries_path_and_message() {
        let err = StorageError::DirectoryCreationFailed {
            path: "media".to_string(),
            message: "500 internal error".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("media"));
        assert!(text.contains("500 internal error"));
    }
}
