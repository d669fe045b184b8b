//! Error types for storage operations.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Coarse classification of a [`StorageError`], for callers that only need
/// to know which side of the transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings could not be turned into a working client.
    Configuration,
    /// Opening, creating or writing a local file failed.
    LocalIo,
    /// The backend rejected the request or could not be reached.
    Remote,
}

/// Errors that can occur in storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Location URL is malformed or unusable for the chosen backend
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Key or relative path cannot be mapped to an object key
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Client settings could not be resolved
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem error
    #[error("{}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Request failed before a response was received, or the response was unusable
    #[error("{op} {key} failed: {message}")]
    Remote {
        op: &'static str,
        key: String,
        message: String,
    },

    /// Backend answered with a non-success status
    #[error("{op} {key} returned HTTP {status}")]
    RemoteStatus {
        op: &'static str,
        key: String,
        status: u16,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidLocation(_)
            | StorageError::InvalidKey(_)
            | StorageError::Config(_) => ErrorKind::Configuration,
            StorageError::LocalIo { .. } => ErrorKind::LocalIo,
            StorageError::Remote { .. } | StorageError::RemoteStatus { .. } => ErrorKind::Remote,
        }
    }

    pub(crate) fn local(path: impl AsRef<Path>, source: io::Error) -> Self {
        StorageError::LocalIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn remote(op: &'static str, key: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Remote {
            op,
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    /// True when the backend reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::RemoteStatus { status: 404, .. })
    }
}
