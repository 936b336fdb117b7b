use std::collections::BTreeMap;

use common::Bucket;
use serde::Serialize;

use crate::lifecycle::{BatchDeletion, DeletionResult, EntityKind, ItemFailure, SkippedFile};

pub(crate) fn kind_counts(counts: &BTreeMap<EntityKind, u64>) -> BTreeMap<String, u64> {
    counts
        .iter()
        .map(|(kind, n)| (kind.as_str().to_string(), *n))
        .collect()
}

/// A media file left in place.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SkippedFileResponse {
    pub bucket: Bucket,
    #[schema(example = "band_Foo_20250101120000.png")]
    pub filename: String,
    /// `NOT_FOUND`, `UNAUTHORIZED`, `DATABASE_ERROR` or `FILE_SYSTEM_ERROR`.
    #[schema(example = "FILE_SYSTEM_ERROR")]
    pub reason: &'static str,
    pub message: String,
}

impl From<&SkippedFile> for SkippedFileResponse {
    fn from(s: &SkippedFile) -> Self {
        Self {
            bucket: s.bucket,
            filename: s.filename.clone(),
            reason: s.reason.as_str(),
            message: s.message.clone(),
        }
    }
}

/// Outcome of deleting one entity and its descendants.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeletionResponse {
    pub kind: EntityKind,
    #[schema(example = 42)]
    pub id: i32,
    /// Rows deleted per entity kind, the target included.
    #[schema(example = json!({"band": 1, "member": 3, "event": 2}))]
    pub deleted: BTreeMap<String, u64>,
    #[schema(example = 6)]
    pub total_deleted: u64,
    /// Reclaimed media as `bucket/filename`.
    #[schema(example = json!(["bands/band_Foo_20250101120000.png"]))]
    pub reclaimed_files: Vec<String>,
    pub skipped_files: Vec<SkippedFileResponse>,
}

impl From<&DeletionResult> for DeletionResponse {
    fn from(r: &DeletionResult) -> Self {
        Self {
            kind: r.target.kind,
            id: r.target.id,
            deleted: kind_counts(&r.deleted),
            total_deleted: r.total_deleted(),
            reclaimed_files: r.reclaimed.clone(),
            skipped_files: r.skipped.iter().map(SkippedFileResponse::from).collect(),
        }
    }
}

/// An id of a batch that was not deleted.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ItemFailureResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "UNAUTHORIZED")]
    pub reason: &'static str,
    pub message: String,
}

impl From<&ItemFailure> for ItemFailureResponse {
    fn from(f: &ItemFailure) -> Self {
        Self {
            id: f.target.id,
            reason: f.reason.as_str(),
            message: f.message.clone(),
        }
    }
}

/// Per-item breakdown of a batch deletion.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchDeletionResponse {
    pub deleted: Vec<DeletionResponse>,
    /// Ids that did not exist. Deleting them again is a no-op.
    #[schema(example = json!([9]))]
    pub not_found: Vec<i32>,
    pub failed: Vec<ItemFailureResponse>,
    /// Rows deleted per entity kind across the whole batch.
    pub totals: BTreeMap<String, u64>,
}

impl From<&BatchDeletion> for BatchDeletionResponse {
    fn from(b: &BatchDeletion) -> Self {
        Self {
            deleted: b.results.iter().map(DeletionResponse::from).collect(),
            not_found: b.not_found.iter().map(|t| t.id).collect(),
            failed: b.failures.iter().map(ItemFailureResponse::from).collect(),
            totals: kind_counts(&b.deleted_counts()),
        }
    }
}
