//! S3-compatible storage.
//!
//! Works with AWS S3, MinIO and other S3-compatible services.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stowage_core::storage::{Location, S3Option, S3Storage, Storage};
//!
//! # async fn example() -> stowage_core::Result<()> {
//! let location = Location::parse("s3://backups/mysql")?;
//! let storage = S3Storage::new(
//!     location,
//!     [
//!         S3Option::Endpoint("http://127.0.0.1:9000".into()),
//!         S3Option::PathStyle,
//!     ],
//! )?;
//!
//! storage.push("2024-01-01.sql.gz", Path::new("/tmp/dump.sql.gz")).await?;
//! for object in storage.read_dir("mysql/").await? {
//!     println!("{} {}", object.name, object.size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Key handling differs between operations. `pull` and `push` take paths
//! relative to the location's prefix. `read_dir` and `remove` take keys
//! relative to the bucket root, so the names `read_dir` returns can be
//! passed to `remove` unchanged.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::File;
use tracing::{debug, info};

use super::client::{BucketConnector, ConnectionConfig, Connector, CredentialSource, ObjectApi};
use super::staging::StagedFile;
use super::{Location, ObjectInfo, Storage, join_key, normalize_endpoint};
use crate::error::{Result, StorageError};

pub const PROTOCOL: &str = "s3";

const DEFAULT_REGION: &str = "us-east-1";

/// Construction options for [`S3Storage`]. Applied in order; a later option
/// of the same kind replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S3Option {
    /// Address the bucket as `endpoint/bucket` instead of `bucket.endpoint`.
    PathStyle,
    Region(String),
    /// Custom endpoint URL, e.g. a local MinIO.
    Endpoint(String),
    AccessKeyId(String),
    SecretAccessKey(String),
    /// Log each request and response status at `debug` level.
    TraceRequests,
}

/// Storage backed by one bucket of an S3-compatible service.
///
/// Holds configuration only. Every operation resolves its settings and
/// builds a fresh client, so an `S3Storage` can be shared freely.
pub struct S3Storage {
    location: Location,
    path_style: bool,
    region: Option<String>,
    endpoint: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    trace_requests: bool,
    connector: Arc<dyn Connector>,
}

impl S3Storage {
    /// Fails only if `location` is not an `s3://` URL naming a bucket.
    /// No request is made.
    pub fn new(location: Location, options: impl IntoIterator<Item = S3Option>) -> Result<Self> {
        if location.scheme() != PROTOCOL {
            return Err(StorageError::InvalidLocation(format!(
                "{location}: expected {PROTOCOL}:// scheme"
            )));
        }
        if location.host().is_empty() {
            return Err(StorageError::InvalidLocation(format!(
                "{location}: missing bucket name"
            )));
        }

        let mut storage = Self {
            location,
            path_style: false,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            trace_requests: false,
            connector: Arc::new(BucketConnector),
        };
        for option in options {
            storage.apply(option);
        }
        Ok(storage)
    }

    /// Replaces the client factory. Used to plug in other object-store
    /// clients, or in-memory ones for tests.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    fn apply(&mut self, option: S3Option) {
        match option {
            S3Option::PathStyle => self.path_style = true,
            S3Option::Region(region) => self.region = Some(region),
            S3Option::Endpoint(endpoint) => self.endpoint = Some(endpoint),
            S3Option::AccessKeyId(id) => self.access_key_id = Some(id),
            S3Option::SecretAccessKey(secret) => self.secret_access_key = Some(secret),
            S3Option::TraceRequests => self.trace_requests = true,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn bucket(&self) -> &str {
        self.location.host()
    }

    /// Key for a path relative to the location prefix.
    pub fn object_key(&self, relative: &str) -> Result<String> {
        let key = join_key(self.location.path(), relative)?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey(format!(
                "'{relative}' resolves to an empty key"
            )));
        }
        Ok(key)
    }

    /// Resolves the settings used for a single call.
    ///
    /// Region falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`, then
    /// `us-east-1`. Credentials are the explicit pair if both halves were
    /// given, otherwise the client library's standard chain.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => CredentialSource::Explicit {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
            },
            (None, None) => CredentialSource::Ambient,
            _ => {
                return Err(StorageError::Config(
                    "access key id and secret access key must be given together".to_string(),
                ));
            }
        };

        let region = self
            .region
            .clone()
            .or_else(region_from_env)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(ConnectionConfig {
            bucket: self.bucket().to_string(),
            region,
            endpoint: self.endpoint.as_deref().map(normalize_endpoint),
            credentials,
            path_style: self.path_style,
            trace_requests: self.trace_requests,
        })
    }

    async fn connect(&self) -> Result<Arc<dyn ObjectApi>> {
        let config = self.connection_config()?;
        debug!(bucket = %config.bucket, region = %config.region, endpoint = ?config.endpoint, "Connecting");
        self.connector.connect(&config).await
    }
}

fn region_from_env() -> Option<String> {
    ["AWS_REGION", "AWS_DEFAULT_REGION"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

#[async_trait]
impl Storage for S3Storage {
    /// The target is written through a temporary file in the same directory
    /// and only renamed into place after the whole body arrived. On failure
    /// the target is left as it was.
    async fn pull(&self, source: &str, target: &Path) -> Result<u64> {
        let key = self.object_key(source)?;
        let api = self.connect().await?;

        let mut staged = StagedFile::create(target)?;
        api.get_object(&key, staged.file_mut(), target).await?;
        let written = staged.commit().await?;

        info!(bucket = %self.bucket(), key = %key, target = %target.display(), bytes = written, "Pulled object");
        Ok(written)
    }

    async fn push(&self, target: &str, source: &Path) -> Result<u64> {
        let key = self.object_key(target)?;
        let api = self.connect().await?;

        let mut file = File::open(source)
            .await
            .map_err(|e| StorageError::local(source, e))?;
        let uploaded = api.put_object(&key, &mut file, source).await?;

        info!(bucket = %self.bucket(), key = %key, source = %source.display(), bytes = uploaded, "Pushed object");
        Ok(uploaded)
    }

    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn url(&self) -> &str {
        self.location.as_str()
    }

    async fn read_dir(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let api = self.connect().await?;

        let mut objects = Vec::new();
        let mut continuation_token = None;
        let mut pages = 0u32;
        loop {
            let page = api.list_page(prefix, continuation_token).await?;
            pages += 1;
            objects.extend(page.objects);
            match page.continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        debug!(bucket = %self.bucket(), prefix, pages, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let api = self.connect().await?;
        api.delete_object(key).await?;
        info!(bucket = %self.bucket(), key, "Removed object");
        Ok(())
    }
}
