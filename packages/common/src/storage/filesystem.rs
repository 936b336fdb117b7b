use std::ffi::OsString;
use std::fs::Metadata;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use super::Bucket;
use super::error::StorageError;
use super::traits::{MediaStore, StoredFile};

/// Filesystem-backed media store.
///
/// Files live at `{base_path}/{bucket}/{filename}`. Every call is bounded by
/// `io_timeout`; a timed-out call is reported, never retried.
pub struct FilesystemMediaStore {
    base_path: PathBuf,
    io_timeout: Duration,
}

impl FilesystemMediaStore {
    /// Create a new filesystem media store.
    pub fn new(base_path: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            base_path: base_path.into(),
            io_timeout,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn bucket_path(&self, bucket: Bucket) -> PathBuf {
        self.base_path.join(bucket.as_str())
    }

    /// Compute the path of a file, rejecting names that would leave the bucket.
    fn file_path(&self, bucket: Bucket, filename: &str) -> Result<PathBuf, StorageError> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\', '\0'])
        {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.bucket_path(bucket).join(filename))
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout {
                op,
                secs: self.io_timeout.as_secs(),
            })?
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredFile>, StorageError> {
        let dir = self.bucket_path(bucket);
        self.bounded("list", async move {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(bucket = %bucket, "Bucket directory does not exist");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(StorageError::from(e)),
            };

            let mut files = Vec::new();
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(bucket = %bucket, error = %e, "Stopped reading bucket early");
                        break;
                    }
                };
                let meta = entry.metadata().await;
                files.extend(listed(bucket, entry.file_name(), meta));
            }
            files.sort_by(|a, b| a.filename.cmp(&b.filename));
            Ok::<_, StorageError>(files)
        })
        .await
    }

    async fn exists(&self, bucket: Bucket, filename: &str) -> Result<bool, StorageError> {
        let path = self.file_path(bucket, filename)?;
        self.bounded("stat", async move { Ok::<_, StorageError>(fs::try_exists(&path).await?) })
            .await
    }

    async fn put(&self, bucket: Bucket, filename: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.file_path(bucket, filename)?;
        let dir = self.bucket_path(bucket);
        self.bounded("write", async move {
            fs::create_dir_all(&dir).await?;
            fs::write(&path, data).await?;
            Ok::<_, StorageError>(())
        })
        .await
    }

    async fn remove(&self, bucket: Bucket, filename: &str) -> Result<bool, StorageError> {
        let path = self.file_path(bucket, filename)?;
        self.bounded("unlink", async move {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StorageError::from(e)),
            }
        })
        .await
    }
}

/// One directory entry as a listing row. Entries that vanished or cannot be
/// read are left out of the listing.
fn listed(bucket: Bucket, name: OsString, meta: io::Result<Metadata>) -> Option<StoredFile> {
    let meta = match meta {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(bucket = %bucket, file = ?name, "File vanished while listing");
            return None;
        }
        Err(e) => {
            warn!(bucket = %bucket, file = ?name, error = %e, "Skipping unreadable entry");
            return None;
        }
    };
    if !meta.is_file() {
        return None;
    }
    let filename = name.into_string().ok()?;
    Some(StoredFile {
        filename,
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
    })
}
