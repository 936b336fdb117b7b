pub mod config;
pub mod storage;

pub use config::{CleanupConfig, StorageConfig};
pub use storage::{Bucket, MediaStore, StorageError, StoredFile};
