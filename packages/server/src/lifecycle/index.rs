use std::collections::BTreeSet;

use common::Bucket;
use sea_orm::{ConnectionTrait, DbErr};

use super::graph::media_fields_in;
use super::store;

/// Filenames in one bucket referenced by at least one live row.
///
/// A set, not a count: a filename referenced by two rows is as protected as one
/// referenced by a single row. Build a fresh index for every destructive
/// decision rather than holding one across calls.
#[derive(Debug, Clone)]
pub struct BlobReferenceIndex {
    bucket: Bucket,
    filenames: BTreeSet<String>,
}

impl BlobReferenceIndex {
    /// Scan every live media column that resolves into `bucket`.
    pub async fn build<C: ConnectionTrait>(conn: &C, bucket: Bucket) -> Result<Self, DbErr> {
        let mut filenames = BTreeSet::new();
        for field in media_fields_in(bucket) {
            for raw in store::live_media(conn, field, None).await? {
                filenames.extend(store::filenames_or_raw(field, &raw));
            }
        }
        Ok(Self { bucket, filenames })
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.filenames.iter().map(String::as_str)
    }
}

/// Targeted re-check of a single file, run immediately before unlinking it.
pub async fn is_referenced<C: ConnectionTrait>(
    conn: &C,
    bucket: Bucket,
    filename: &str,
) -> Result<bool, DbErr> {
    for field in media_fields_in(bucket) {
        // The LIKE narrows candidates; the exact filename comparison decides.
        for raw in store::live_media(conn, field, Some(filename)).await? {
            match store::filenames_in(field, &raw) {
                Some(names) if names.iter().any(|f| f == filename) => return Ok(true),
                Some(_) => {}
                // Unparseable, but it mentions the file.
                None => return Ok(true),
            }
        }
    }
    Ok(false)
}
