use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::{CleanupConfig, MediaStore};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};
use tracing::{error, info, warn};

use crate::entity::report::ReportStatus;
use crate::entity::{
    band, comment, email_verification, event, like, media_blob, member, post, report, user,
};

use super::cascade::CascadeDeleter;
use super::error::{FailureReason, LifecycleError};
use super::gc::{GarbageCollector, SkippedFile};
use super::graph::EntityKind;
use super::orphans::{OrphanScanner, orphan_targets};
use super::store;

/// One isolated step of a cleanup run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CleanupStep {
    ExpiredVerifications,
    OldReports,
    OrphanedLikes,
    OrphanedUserData,
    OrphanedFiles,
}

impl CleanupStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpiredVerifications => "expired_verifications",
            Self::OldReports => "old_reports",
            Self::OrphanedLikes => "orphaned_likes",
            Self::OrphanedUserData => "orphaned_user_data",
            Self::OrphanedFiles => "orphaned_files",
        }
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StepFailure {
    pub step: CleanupStep,
    /// The row or bucket the failure is about, when narrower than the step.
    pub subject: Option<String>,
    pub reason: FailureReason,
    pub message: String,
}

/// Aggregated counts of one cleanup run.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub expired_verifications: u64,
    pub old_reports: u64,
    pub orphaned_likes: u64,
    /// Rows removed by cascading over orphans, per kind.
    pub orphaned_user_data: BTreeMap<EntityKind, u64>,
    /// Reclaimed files as `bucket/filename`.
    pub orphaned_files: Vec<String>,
    pub skipped_files: Vec<SkippedFile>,
    pub failures: Vec<StepFailure>,
}

impl CleanupReport {
    pub fn total_cleaned(&self) -> u64 {
        self.expired_verifications
            + self.old_reports
            + self.orphaned_likes
            + self.orphaned_user_data.values().sum::<u64>()
            + self.orphaned_files.len() as u64
    }

    fn fail(&mut self, step: CleanupStep, subject: Option<String>, err: &LifecycleError) {
        error!(step = %step, subject = ?subject, error = %err, "Cleanup step failed");
        self.failures.push(StepFailure {
            step,
            subject,
            reason: err.reason(),
            message: err.to_string(),
        });
    }
}

/// Current backlog, without changing anything.
#[derive(Debug, Clone, Default)]
pub struct CleanupStatus {
    pub expired_verifications: u64,
    pub old_reports: u64,
    pub orphaned_likes: u64,
    pub orphaned_rows: BTreeMap<EntityKind, u64>,
    /// Row count per table.
    pub totals: BTreeMap<&'static str, u64>,
}

/// Orchestrates a maintenance pass over the database and the media buckets.
pub struct CleanupScheduler<'a, C> {
    conn: &'a C,
    store: &'a dyn MediaStore,
    config: &'a CleanupConfig,
}

impl<'a, C> CleanupScheduler<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C, store: &'a dyn MediaStore, config: &'a CleanupConfig) -> Self {
        Self {
            conn,
            store,
            config,
        }
    }

    /// Every step, including the bucket-wide file sweep.
    pub async fn run_full(&self) -> CleanupReport {
        info!("Starting full cleanup");
        let mut report = CleanupReport::default();
        self.run_database_steps(&mut report, true).await;
        self.sweep_files(&mut report).await;
        log_summary("full", &report);
        report
    }

    /// Database steps only. No file is touched.
    pub async fn run_quick(&self) -> CleanupReport {
        info!("Starting quick cleanup");
        let mut report = CleanupReport::default();
        self.run_database_steps(&mut report, false).await;
        log_summary("quick", &report);
        report
    }

    /// The bucket-wide file sweep only.
    pub async fn run_files(&self) -> CleanupReport {
        info!("Starting file cleanup");
        let mut report = CleanupReport::default();
        self.sweep_files(&mut report).await;
        log_summary("files", &report);
        report
    }

    pub async fn status(&self) -> Result<CleanupStatus, LifecycleError> {
        let scanner = OrphanScanner::new(self.conn);

        let expired_verifications = email_verification::Entity::find()
            .filter(email_verification::Column::ExpiresAt.lt(Utc::now()))
            .count(self.conn)
            .await?;
        let old_reports = report::Entity::find()
            .filter(self.old_reports()?)
            .count(self.conn)
            .await?;
        let orphaned_likes = scanner.dangling_likes().await?.len() as u64;
        let orphaned_rows = scanner.count_orphans().await?;

        let mut totals = BTreeMap::new();
        totals.insert("user", user::Entity::find().count(self.conn).await?);
        totals.insert("band", band::Entity::find().count(self.conn).await?);
        totals.insert("member", member::Entity::find().count(self.conn).await?);
        totals.insert("event", event::Entity::find().count(self.conn).await?);
        totals.insert("post", post::Entity::find().count(self.conn).await?);
        totals.insert("comment", comment::Entity::find().count(self.conn).await?);
        totals.insert("like", like::Entity::find().count(self.conn).await?);
        totals.insert("report", report::Entity::find().count(self.conn).await?);
        totals.insert(
            "email_verification",
            email_verification::Entity::find().count(self.conn).await?,
        );
        totals.insert("media_blob", media_blob::Entity::find().count(self.conn).await?);

        Ok(CleanupStatus {
            expired_verifications,
            old_reports,
            orphaned_likes,
            orphaned_rows,
            totals,
        })
    }

    async fn run_database_steps(&self, report: &mut CleanupReport, reclaim: bool) {
        match self.delete_expired_verifications().await {
            Ok(n) => report.expired_verifications = n,
            Err(e) => report.fail(CleanupStep::ExpiredVerifications, None, &e),
        }

        match self.delete_old_reports().await {
            Ok(n) => report.old_reports = n,
            Err(e) => report.fail(CleanupStep::OldReports, None, &e),
        }

        match self.delete_orphaned_likes().await {
            Ok(n) => report.orphaned_likes = n,
            Err(e) => report.fail(CleanupStep::OrphanedLikes, None, &e),
        }

        self.delete_orphaned_user_data(report, reclaim).await;
    }

    async fn delete_expired_verifications(&self) -> Result<u64, LifecycleError> {
        let res = email_verification::Entity::delete_many()
            .filter(email_verification::Column::ExpiresAt.lt(Utc::now()))
            .exec(self.conn)
            .await?;
        if res.rows_affected > 0 {
            info!(count = res.rows_affected, "Deleted expired verification codes");
        }
        Ok(res.rows_affected)
    }

    fn retention_cutoff(&self) -> Result<DateTime<Utc>, LifecycleError> {
        let days = self.config.report_retention_days;
        if days < 0 {
            return Err(LifecycleError::Config(format!(
                "report_retention_days must not be negative, got {days}"
            )));
        }
        TimeDelta::try_days(days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                LifecycleError::Config(format!("report_retention_days {days} is out of range"))
            })
    }

    /// Resolved or dismissed reports past the retention window.
    fn old_reports(&self) -> Result<Condition, LifecycleError> {
        Ok(Condition::all()
            .add(report::Column::Status.is_in(ReportStatus::TERMINAL.iter().copied()))
            .add(report::Column::CreatedAt.lt(self.retention_cutoff()?)))
    }

    async fn delete_old_reports(&self) -> Result<u64, LifecycleError> {
        let res = report::Entity::delete_many()
            .filter(self.old_reports()?)
            .exec(self.conn)
            .await?;
        if res.rows_affected > 0 {
            info!(
                count = res.rows_affected,
                retention_days = self.config.report_retention_days,
                "Deleted old resolved reports"
            );
        }
        Ok(res.rows_affected)
    }

    async fn delete_orphaned_likes(&self) -> Result<u64, LifecycleError> {
        let ids = OrphanScanner::new(self.conn).dangling_likes().await?;
        let n = store::delete_ids(self.conn, EntityKind::Like, &ids).await?;
        if n > 0 {
            info!(count = n, "Deleted likes on missing posts or comments");
        }
        Ok(n)
    }

    async fn delete_orphaned_user_data(&self, report: &mut CleanupReport, reclaim: bool) {
        let step = CleanupStep::OrphanedUserData;
        let orphans = match OrphanScanner::new(self.conn).find_orphans().await {
            Ok(orphans) => orphans,
            Err(e) => {
                report.fail(step, None, &e.into());
                return;
            }
        };
        if orphans.is_empty() {
            return;
        }

        let mut deleter = CascadeDeleter::new(self.conn, self.store);
        if !reclaim {
            deleter = deleter.without_reclamation();
        }
        // Earlier cascades may already have removed later targets; those come
        // back as not found and are ignored.
        let batch = deleter.delete_many(&orphan_targets(&orphans)).await;

        for result in &batch.results {
            report.orphaned_files.extend(result.reclaimed.iter().cloned());
            report.skipped_files.extend(result.skipped.iter().cloned());
        }
        for failure in &batch.failures {
            let err = failure.message.clone();
            error!(entity = %failure.target, error = %err, "Failed to delete orphan");
            report.failures.push(StepFailure {
                step,
                subject: Some(failure.target.to_string()),
                reason: failure.reason,
                message: err,
            });
        }
        report.orphaned_user_data = batch.deleted_counts();
        info!(
            roots = batch.results.len(),
            rows = report.orphaned_user_data.values().sum::<u64>(),
            "Deleted orphaned rows"
        );
    }

    async fn sweep_files(&self, report: &mut CleanupReport) {
        let gc = GarbageCollector::new(self.conn, self.store)
            .with_grace_period(Duration::from_secs(self.config.anonymous_grace_secs));
        for (bucket, result) in gc.sweep_all().await {
            match result {
                Ok(sweep) => {
                    report
                        .orphaned_files
                        .extend(sweep.deleted.iter().map(|f| format!("{bucket}/{f}")));
                    report.skipped_files.extend(sweep.skipped);
                }
                Err(e) => report.fail(CleanupStep::OrphanedFiles, Some(bucket.to_string()), &e),
            }
        }
    }
}

fn log_summary(mode: &str, report: &CleanupReport) {
    if report.failures.is_empty() {
        info!(mode, total = report.total_cleaned(), "Cleanup finished");
    } else {
        warn!(
            mode,
            total = report.total_cleaned(),
            failures = report.failures.len(),
            "Cleanup finished with failures"
        );
    }
}

/// Run a full cleanup on a fixed interval, for as long as the process lives.
pub async fn run_cleanup_scheduler(
    db: DatabaseConnection,
    store: Arc<dyn MediaStore>,
    config: CleanupConfig,
) {
    let period = Duration::from_secs(config.interval_secs.max(1));

    info!(
        interval_secs = config.interval_secs,
        grace_secs = config.anonymous_grace_secs,
        "Starting cleanup scheduler"
    );

    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; wait a full period before the first run.
    interval.tick().await;

    loop {
        interval.tick().await;
        let report = CleanupScheduler::new(&db, store.as_ref(), &config)
            .run_full()
            .await;
        if !report.failures.is_empty() {
            error!(
                failures = report.failures.len(),
                "Periodic cleanup reported failures"
            );
        }
    }
}
