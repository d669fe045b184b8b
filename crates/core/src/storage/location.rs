use std::fmt;

use url::Url;

use crate::error::{Result, StorageError};

/// A parsed storage URL such as `s3://bucket/prefix` or `file:///var/backups`.
///
/// The string the location was parsed from is kept verbatim so that
/// [`Location::as_str`] round-trips exactly, independent of how `url`
/// normalizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    raw: String,
    scheme: String,
    host: String,
    path: String,
}

impl Location {
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)
            .map_err(|e| StorageError::InvalidLocation(format!("{input}: {e}")))?;
        Ok(Self::from_url(input.to_string(), &url))
    }

    fn from_url(raw: String, url: &Url) -> Self {
        let path = urlencoding::decode(url.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| url.path().to_string());
        Self {
            raw,
            scheme: url.scheme().to_string(),
            host: url.host_str().unwrap_or("").to_string(),
            path,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host portion; the bucket name for `s3` locations.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Percent-decoded path; the key prefix for `s3` locations.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<Url> for Location {
    type Error = StorageError;

    fn try_from(url: Url) -> Result<Self> {
        Ok(Self::from_url(url.as_str().to_string(), &url))
    }
}

impl std::str::FromStr for Location {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
