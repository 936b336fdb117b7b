use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{CleanupReport, CleanupStatus, StepFailure};

use super::deletion::{SkippedFileResponse, kind_counts};

/// Which steps a cleanup run performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Database steps followed by a sweep of every media bucket.
    #[default]
    Full,
    /// Database steps only.
    Quick,
    /// Media buckets only.
    Files,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct RunCleanupRequest {
    #[serde(default)]
    pub mode: CleanupMode,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StepFailureResponse {
    #[schema(example = "orphaned_user_data")]
    pub step: &'static str,
    /// Entity or bucket the failure concerns, if narrower than the step.
    #[schema(example = "post#12")]
    pub subject: Option<String>,
    #[schema(example = "DATABASE_ERROR")]
    pub reason: &'static str,
    pub message: String,
}

impl From<&StepFailure> for StepFailureResponse {
    fn from(f: &StepFailure) -> Self {
        Self {
            step: f.step.as_str(),
            subject: f.subject.clone(),
            reason: f.reason.as_str(),
            message: f.message.clone(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CleanupReportResponse {
    #[schema(example = 4)]
    pub expired_verifications: u64,
    #[schema(example = 2)]
    pub old_reports: u64,
    #[schema(example = 1)]
    pub orphaned_likes: u64,
    /// Orphaned rows removed per entity kind, descendants included.
    #[schema(example = json!({"band": 1, "member": 2}))]
    pub orphaned_user_data: BTreeMap<String, u64>,
    /// Reclaimed media as `bucket/filename`.
    pub orphaned_files: Vec<String>,
    pub skipped_files: Vec<SkippedFileResponse>,
    pub failures: Vec<StepFailureResponse>,
    #[schema(example = 10)]
    pub total_cleaned: u64,
}

impl From<&CleanupReport> for CleanupReportResponse {
    fn from(r: &CleanupReport) -> Self {
        Self {
            expired_verifications: r.expired_verifications,
            old_reports: r.old_reports,
            orphaned_likes: r.orphaned_likes,
            orphaned_user_data: kind_counts(&r.orphaned_user_data),
            orphaned_files: r.orphaned_files.clone(),
            skipped_files: r.skipped_files.iter().map(SkippedFileResponse::from).collect(),
            failures: r.failures.iter().map(StepFailureResponse::from).collect(),
            total_cleaned: r.total_cleaned(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CleanupStatusResponse {
    #[schema(example = 4)]
    pub expired_verifications: u64,
    #[schema(example = 2)]
    pub old_reports: u64,
    #[schema(example = 1)]
    pub orphaned_likes: u64,
    /// Orphaned rows per entity kind, before cascading.
    #[schema(example = json!({"band": 0, "member": 2}))]
    pub orphaned_rows: BTreeMap<String, u64>,
    /// Row count per table.
    #[schema(example = json!({"user": 120, "band": 35}))]
    pub totals: BTreeMap<String, u64>,
}

impl From<CleanupStatus> for CleanupStatusResponse {
    fn from(s: CleanupStatus) -> Self {
        Self {
            expired_verifications: s.expired_verifications,
            old_reports: s.old_reports,
            orphaned_likes: s.orphaned_likes,
            orphaned_rows: kind_counts(&s.orphaned_rows),
            totals: s
                .totals
                .into_iter()
                .map(|(table, n)| (table.to_string(), n))
                .collect(),
        }
    }
}
