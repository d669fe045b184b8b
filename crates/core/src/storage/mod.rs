pub mod client;
pub mod endpoint;
pub mod local;
pub mod location;
pub mod s3;
mod staging;

#[cfg(test)]
pub(crate) mod memory;
#[cfg(test)]
pub(crate) mod stub;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, StorageError};

pub use endpoint::normalize_endpoint;
pub use local::FileStorage;
pub use location::Location;
pub use self::s3::{S3Option, S3Storage};

/// A place files can be copied to and from.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Downloads `source` (relative to the location) to the local `target`.
    /// Returns the number of bytes written.
    async fn pull(&self, source: &str, target: &Path) -> Result<u64>;

    /// Uploads the local `source` to `target` (relative to the location).
    /// Returns the number of bytes uploaded.
    async fn push(&self, target: &str, source: &Path) -> Result<u64>;

    /// Scheme this storage serves, e.g. `"s3"`.
    fn protocol(&self) -> &'static str;

    /// The location string the storage was created from.
    fn url(&self) -> &str;

    /// Lists entries whose name starts with `prefix`.
    async fn read_dir(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Deletes `key`. Deleting something that does not exist succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// An entry returned by [`Storage::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectInfo {
    /// Object stores have no directories.
    pub fn is_dir(&self) -> bool {
        false
    }

    /// Permission bits do not exist for objects; always 0.
    pub fn mode(&self) -> u32 {
        0
    }
}

/// Joins a key prefix and a relative path with single slashes.
///
/// Empty and `.` segments are dropped. `..` is rejected rather than resolved
/// so a relative path can never climb out of the prefix.
pub fn join_key(prefix: &str, relative: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in prefix.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidKey(format!(
                    "'{relative}' under '{prefix}': '..' segments are not allowed"
                )));
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Opens the storage a URL points at.
///
/// `options` only apply to `s3` locations and are ignored for `file`.
pub fn open(url: &str, options: impl IntoIterator<Item = S3Option>) -> Result<Box<dyn Storage>> {
    let location = Location::parse(url)?;
    match location.scheme() {
        self::s3::PROTOCOL => Ok(Box::new(S3Storage::new(location, options)?)),
        local::PROTOCOL => Ok(Box::new(FileStorage::new(location)?)),
        other => Err(StorageError::InvalidLocation(format!(
            "unsupported scheme: {other} (supported: s3, file)"
        ))),
    }
}
