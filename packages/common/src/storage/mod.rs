mod bucket;
mod error;
mod traits;

pub mod filesystem;
pub mod name;

pub use bucket::Bucket;
pub use error::StorageError;
pub use name::{BlobName, media_filename};
pub use traits::{MediaStore, StoredFile};
