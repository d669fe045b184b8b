//! Seam between [`S3Storage`](super::s3::S3Storage) and the object-store
//! client library.
//!
//! `S3Storage` resolves a [`ConnectionConfig`] on every call and hands it to
//! a [`Connector`], which produces an [`ObjectApi`] for that call. The
//! default [`BucketConnector`] builds a `rust-s3` [`Bucket`]; multipart
//! transfer, request signing and credential chains stay inside that library.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::serde_types::Object;
use tokio::fs::File;
use tracing::debug;

use super::ObjectInfo;
use crate::error::{Result, StorageError};

/// Where credentials come from for a single call.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Access key pair supplied by the caller.
    Explicit {
        access_key_id: String,
        secret_access_key: String,
    },
    /// The client library's standard chain: `AWS_ACCESS_KEY_ID` /
    /// `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`, the shared profile
    /// file, STS web identity and instance metadata.
    Ambient,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Explicit { access_key_id, .. } => f
                .debug_struct("Explicit")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish(),
            CredentialSource::Ambient => f.write_str("Ambient"),
        }
    }
}

/// Fully resolved settings for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub bucket: String,
    pub region: String,
    /// Normalized endpoint override; `None` means the AWS endpoint for `region`.
    pub endpoint: Option<String>,
    pub credentials: CredentialSource,
    pub path_style: bool,
    /// Log every request and its response status at `debug` level.
    pub trace_requests: bool,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Present while the backend has more results.
    pub continuation_token: Option<String>,
}

/// The object-store primitives the adapter needs.
#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Streams the object body into `writer`. Failures writing to it are
    /// reported as [`StorageError::LocalIo`] against `local`.
    async fn get_object(&self, key: &str, writer: &mut File, local: &Path) -> Result<()>;

    /// Uploads everything readable from `reader`, replacing any existing
    /// object. Returns the number of bytes sent. Failures reading from it are
    /// reported as [`StorageError::LocalIo`] against `local`.
    async fn put_object(&self, key: &str, reader: &mut File, local: &Path) -> Result<u64>;

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}

/// Builds a per-call client from resolved settings.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn ObjectApi>>;
}

/// Default connector backed by `rust-s3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketConnector;

#[async_trait]
impl Connector for BucketConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn ObjectApi>> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config.region.parse().map_err(|e| {
                StorageError::Config(format!("invalid region '{}': {e}", config.region))
            })?,
        };

        let credentials = match &config.credentials {
            CredentialSource::Explicit {
                access_key_id,
                secret_access_key,
            } => Credentials::new(
                Some(access_key_id.as_str()),
                Some(secret_access_key.as_str()),
                None,
                None,
                None,
            ),
            // The chain reads profile files and may query instance metadata
            // with blocking HTTP.
            CredentialSource::Ambient => tokio::task::spawn_blocking(Credentials::default)
                .await
                .map_err(|e| StorageError::Config(format!("credential lookup failed: {e}")))?,
        }
        .map_err(|e| StorageError::Config(format!("failed to load credentials: {e}")))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(format!("failed to create bucket client: {e}")))?;
        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Arc::new(BucketApi {
            bucket,
            trace: config.trace_requests,
        }))
    }
}

struct BucketApi {
    bucket: Box<Bucket>,
    trace: bool,
}

impl BucketApi {
    fn trace_request(&self, op: &str, key: &str) {
        if self.trace {
            debug!(bucket = %self.bucket.name(), op, key, "S3 request");
        }
    }

    fn trace_response(&self, op: &str, key: &str, status: u16) {
        if self.trace {
            debug!(bucket = %self.bucket.name(), op, key, status, "S3 response");
        }
    }
}

/// `rust-s3` reports failures of the local reader or writer as
/// `S3Error::Io`; everything else happened on the wire.
fn transfer_error(op: &'static str, key: &str, local: &Path, err: S3Error) -> StorageError {
    match err {
        S3Error::Io(source) => StorageError::local(local, source),
        other => StorageError::remote(op, key, other),
    }
}

fn check_status(op: &'static str, key: &str, status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(StorageError::RemoteStatus {
            op,
            key: key.to_string(),
            status,
        })
    }
}

#[async_trait]
impl ObjectApi for BucketApi {
    async fn get_object(&self, key: &str, writer: &mut File, local: &Path) -> Result<()> {
        self.trace_request("GET", key);
        let status = self
            .bucket
            .get_object_to_writer(key, writer)
            .await
            .map_err(|e| transfer_error("GET", key, local, e))?;
        self.trace_response("GET", key, status);
        check_status("GET", key, status)
    }

    async fn put_object(&self, key: &str, reader: &mut File, local: &Path) -> Result<u64> {
        self.trace_request("PUT", key);
        let response = self
            .bucket
            .put_object_stream(reader, key)
            .await
            .map_err(|e| transfer_error("PUT", key, local, e))?;
        self.trace_response("PUT", key, response.status_code());
        check_status("PUT", key, response.status_code())?;
        Ok(response.uploaded_bytes() as u64)
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        self.trace_request("LIST", prefix);
        let (result, status) = self
            .bucket
            .list_page(prefix.to_string(), None, continuation_token, None, None)
            .await
            .map_err(|e| StorageError::remote("LIST", prefix, e))?;
        self.trace_response("LIST", prefix, status);
        check_status("LIST", prefix, status)?;

        let continuation_token = if result.is_truncated {
            result.next_continuation_token
        } else {
            None
        };
        Ok(ListPage {
            objects: result.contents.into_iter().map(ObjectInfo::from).collect(),
            continuation_token,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.trace_request("DELETE", key);
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StorageError::remote("DELETE", key, e))?;
        self.trace_response("DELETE", key, response.status_code());
        check_status("DELETE", key, response.status_code())
    }
}

impl From<Object> for ObjectInfo {
    fn from(obj: Object) -> Self {
        ObjectInfo {
            last_modified: parse_last_modified(&obj.last_modified),
            size: obj.size as u64,
            name: obj.key,
        }
    }
}

/// Listing timestamps are ISO 8601 in UTC, e.g. `2009-10-12T17:50:30.000Z`.
fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
