use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Bucket;
use super::error::StorageError;

/// A file found in a bucket directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    /// Last modification time, when the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// Bucketed media storage with flat, per-bucket filenames.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// List regular files in a bucket. A bucket that does not exist yet is empty.
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredFile>, StorageError>;

    /// Check whether a file exists.
    async fn exists(&self, bucket: Bucket, filename: &str) -> Result<bool, StorageError>;

    /// Write a file, replacing any existing one with the same name.
    async fn put(&self, bucket: Bucket, filename: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn remove(&self, bucket: Bucket, filename: &str) -> Result<bool, StorageError>;
}
