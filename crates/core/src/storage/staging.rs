use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, StorageError};

/// A download destination that only appears at its final path once
/// [`StagedFile::commit`] succeeds.
///
/// Data is written to a hidden temporary file next to the target. Dropping a
/// `StagedFile` without committing (error path, cancelled future) deletes the
/// temporary file and leaves any existing target untouched.
///
/// On Unix the temporary file is created with mode `0666` minus the umask,
/// the same as a plain `File::create`, so the committed file is not left
/// owner-only.
pub(crate) struct StagedFile {
    file: File,
    temp: TempPath,
    target: PathBuf,
}

impl StagedFile {
    /// Fails with [`StorageError::LocalIo`] if the target's directory does
    /// not exist or is not writable. Missing directories are not created.
    pub(crate) fn create(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".stowage-").suffix(".part");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let named = builder
            .tempfile_in(dir)
            .map_err(|e| StorageError::local(target, e))?;
        let (file, temp) = named.into_parts();
        Ok(Self {
            file: File::from_std(file),
            temp,
            target: target.to_path_buf(),
        })
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Flushes, syncs and renames the temporary file over the target.
    /// Returns the final size in bytes.
    pub(crate) async fn commit(self) -> Result<u64> {
        let Self {
            mut file,
            temp,
            target,
        } = self;

        file.flush()
            .await
            .map_err(|e| StorageError::local(&temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::local(&temp, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| StorageError::local(&temp, e))?
            .len();
        drop(file);

        temp.persist(&target)
            .map_err(|e| StorageError::local(&target, e.error))?;
        Ok(len)
    }
}
