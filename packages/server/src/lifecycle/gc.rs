use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::storage::BlobName;
use common::storage::name::is_image;
use common::{Bucket, MediaStore};
use sea_orm::ConnectionTrait;
use tracing::{debug, info, warn};

use super::error::{FailureReason, LifecycleError};
use super::graph::{EntityKind, EntityRef};
use super::index::{self, BlobReferenceIndex};
use super::ledger::BlobLedger;
use super::store;

/// A file that could not be reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub bucket: Bucket,
    pub filename: String,
    pub reason: FailureReason,
    pub message: String,
}

/// Outcome of one bucket sweep.
#[derive(Debug, Clone)]
pub struct ReclaimReport {
    pub bucket: Bucket,
    pub deleted: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Candidates left in place because they are referenced or too young.
    pub kept: u64,
}

impl ReclaimReport {
    fn new(bucket: Bucket) -> Self {
        Self {
            bucket,
            deleted: Vec::new(),
            skipped: Vec::new(),
            kept: 0,
        }
    }

    fn skip(&mut self, filename: &str, err: LifecycleError) {
        warn!(bucket = %self.bucket, filename, error = %err, "Skipping media file");
        self.skipped.push(SkippedFile {
            bucket: self.bucket,
            filename: filename.to_string(),
            reason: err.reason(),
            message: err.to_string(),
        });
    }
}

/// What a scoped sweep may touch after a subtree was deleted.
#[derive(Debug, Clone, Default)]
pub struct ReclaimScope {
    /// Current media of the deleted rows.
    pub files: BTreeSet<String>,
    /// Slugs of the deleted rows, matched against named uploads.
    pub slugs: BTreeSet<String>,
    /// Deleted rows, matched against ledger ownership.
    pub owners: Vec<EntityRef>,
}

impl ReclaimScope {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.slugs.is_empty() && self.owners.is_empty()
    }
}

/// Reconciles bucket directories against live database references.
///
/// Files are only ever unlinked after a targeted re-check finds no live
/// reference. Unlink failures are reported as skipped, never raised.
pub struct GarbageCollector<'a, C: ConnectionTrait> {
    conn: &'a C,
    store: &'a dyn MediaStore,
    grace: chrono::Duration,
}

impl<'a, C: ConnectionTrait> GarbageCollector<'a, C> {
    pub fn new(conn: &'a C, store: &'a dyn MediaStore) -> Self {
        Self {
            conn,
            store,
            grace: chrono::Duration::zero(),
        }
    }

    /// Leave unreferenced files younger than `grace` to a later sweep.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::MAX);
        self
    }

    /// Bucket-wide sweep: every unreferenced image file is reclaimable,
    /// including anonymous uploads whose owner cannot be determined.
    pub async fn sweep(&self, bucket: Bucket) -> Result<ReclaimReport, LifecycleError> {
        let index = BlobReferenceIndex::build(self.conn, bucket).await?;
        let files = self.store.list(bucket).await?;
        let ledger = if self.grace > chrono::Duration::zero() {
            BlobLedger::new(self.conn).entries(bucket).await?
        } else {
            Default::default()
        };
        let cutoff = Utc::now().checked_sub_signed(self.grace);

        let mut report = ReclaimReport::new(bucket);
        for file in files.iter().filter(|f| is_image(&f.filename)) {
            if index.contains(&file.filename) {
                report.kept += 1;
                continue;
            }
            if self.grace > chrono::Duration::zero() {
                let uploaded = ledger
                    .get(&file.filename)
                    .map(|e| e.uploaded_at)
                    .or(file.modified);
                if !old_enough(uploaded, cutoff) {
                    debug!(bucket = %bucket, filename = %file.filename, "Within grace period");
                    report.kept += 1;
                    continue;
                }
            }
            self.reclaim(&mut report, &file.filename).await;
        }

        info!(
            bucket = %bucket,
            referenced = index.len(),
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            kept = report.kept,
            "Swept bucket"
        );
        Ok(report)
    }

    /// Sweep every bucket. One bucket failing does not stop the others.
    pub async fn sweep_all(&self) -> Vec<(Bucket, Result<ReclaimReport, LifecycleError>)> {
        let mut results = Vec::with_capacity(Bucket::ALL.len());
        for &bucket in Bucket::ALL {
            let result = self.sweep(bucket).await;
            if let Err(e) = &result {
                warn!(bucket = %bucket, error = %e, "Bucket sweep failed");
            }
            results.push((bucket, result));
        }
        results
    }

    /// Conservative sweep after a subtree deletion.
    ///
    /// Only files tied to the deleted rows are candidates: their current media,
    /// ledger entries naming them, and named uploads carrying their slug when
    /// no live row shares that slug. Other anonymous files are never touched.
    pub async fn sweep_scoped(
        &self,
        bucket: Bucket,
        scope: &ReclaimScope,
    ) -> Result<ReclaimReport, LifecycleError> {
        let mut report = ReclaimReport::new(bucket);
        if scope.is_empty() {
            return Ok(report);
        }

        let index = BlobReferenceIndex::build(self.conn, bucket).await?;
        let owned = BlobLedger::new(self.conn)
            .owned_by(bucket, &scope.owners)
            .await?;
        let live_slugs = if scope.slugs.is_empty() {
            Default::default()
        } else {
            store::live_slugs(self.conn, EntityKind::for_bucket(bucket)).await?
        };
        let files = self.store.list(bucket).await?;

        for file in files.iter().filter(|f| is_image(&f.filename)) {
            let by_slug = || match BlobName::parse(bucket, &file.filename).slug() {
                Some(slug) => scope.slugs.contains(slug) && !live_slugs.contains(slug),
                None => false,
            };
            let candidate =
                scope.files.contains(&file.filename) || owned.contains(&file.filename) || by_slug();
            if !candidate {
                continue;
            }
            if index.contains(&file.filename) {
                debug!(bucket = %bucket, filename = %file.filename, "Still referenced");
                report.kept += 1;
                continue;
            }
            self.reclaim(&mut report, &file.filename).await;
        }

        Ok(report)
    }

    /// Re-verify and unlink one file.
    async fn reclaim(&self, report: &mut ReclaimReport, filename: &str) {
        let bucket = report.bucket;
        match index::is_referenced(self.conn, bucket, filename).await {
            Ok(true) => {
                debug!(bucket = %bucket, filename, "Referenced since index build");
                report.kept += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                report.skip(filename, e.into());
                return;
            }
        }

        match self.store.remove(bucket, filename).await {
            Ok(true) => {
                info!(bucket = %bucket, filename, "Reclaimed media file");
                report.deleted.push(filename.to_string());
            }
            Ok(false) => debug!(bucket = %bucket, filename, "Already gone"),
            Err(e) => {
                report.skip(filename, e.into());
                return;
            }
        }

        if let Err(e) = BlobLedger::new(self.conn).forget(bucket, filename).await {
            warn!(bucket = %bucket, filename, error = %e, "Failed to drop ledger entry");
        }
    }
}

fn old_enough(uploaded: Option<DateTime<Utc>>, cutoff: Option<DateTime<Utc>>) -> bool {
    // Unknown age: leave it for a sweep that can tell.
    match (uploaded, cutoff) {
        (Some(t), Some(cutoff)) => t <= cutoff,
        _ => false,
    }
}
