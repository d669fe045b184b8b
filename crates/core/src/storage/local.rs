use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use super::staging::StagedFile;
use super::{Location, ObjectInfo, Storage, join_key};
use crate::error::{Result, StorageError};

pub const PROTOCOL: &str = "file";

/// Storage rooted at a local directory, addressed as `file:///path/to/dir`.
///
/// All keys, including those given to `read_dir` and `remove`, are relative
/// to the root directory and use `/` separators.
pub struct FileStorage {
    location: Location,
    root: PathBuf,
}

impl FileStorage {
    pub fn new(location: Location) -> Result<Self> {
        if location.scheme() != PROTOCOL {
            return Err(StorageError::InvalidLocation(format!(
                "{location}: expected {PROTOCOL}:// scheme"
            )));
        }
        if !matches!(location.host(), "" | "localhost") {
            return Err(StorageError::InvalidLocation(format!(
                "{location}: file locations cannot name a remote host"
            )));
        }
        if location.path().is_empty() {
            return Err(StorageError::InvalidLocation(format!(
                "{location}: missing directory"
            )));
        }
        let root = PathBuf::from(location.path());
        Ok(Self { location, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let key = join_key("", key)?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn copy_into(source: &Path, target: &Path) -> Result<u64> {
        let mut input = tokio::fs::File::open(source)
            .await
            .map_err(|e| StorageError::local(source, e))?;
        let mut staged = StagedFile::create(target)?;
        tokio::io::copy(&mut input, staged.file_mut())
            .await
            .map_err(|e| StorageError::local(target, e))?;
        staged.commit().await
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn pull(&self, source: &str, target: &Path) -> Result<u64> {
        let full = self.full_path(source)?;
        let written = Self::copy_into(&full, target).await?;
        info!(source = %full.display(), target = %target.display(), bytes = written, "Pulled file");
        Ok(written)
    }

    async fn push(&self, target: &str, source: &Path) -> Result<u64> {
        let full = self.full_path(target)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::local(parent, e))?;
        }
        let written = Self::copy_into(source, &full).await?;
        info!(source = %source.display(), target = %full.display(), bytes = written, "Pushed file");
        Ok(written)
    }

    fn protocol(&self) -> &'static str {
        PROTOCOL
    }

    fn url(&self) -> &str {
        self.location.as_str()
    }

    async fn read_dir(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, rel)) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::local(&dir, e))?;
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| StorageError::local(&dir, e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = if rel.is_empty() {
                    name
                } else {
                    format!("{rel}/{name}")
                };
                let metadata = entry
                    .metadata()
                    .await
                    .map_err(|e| StorageError::local(entry.path(), e))?;
                if metadata.is_dir() {
                    pending.push((entry.path(), key));
                } else if key.starts_with(prefix) {
                    entries.push(ObjectInfo {
                        name: key,
                        size: metadata.len(),
                        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                    });
                }
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let full = self.full_path(key)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                info!(path = %full.display(), "Removed file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::local(&full, e)),
        }
    }
}
