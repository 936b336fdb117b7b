use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use bandhub::entity::report::ReportStatus;
use bandhub::entity::{band, comment, email_verification, like, member, report, user};
use bandhub::lifecycle::{CleanupScheduler, CleanupStep, EntityKind, FailureReason};
use common::{Bucket, CleanupConfig};

use crate::common::{TS, TestApp};

const MISSING: i32 = 9_999;

/// One of each kind of leftover a cleanup pass removes.
async fn seed_backlog(app: &TestApp) {
    let now = Utc::now();
    app.create_verification("old@example.com", now - Duration::hours(1))
        .await;
    app.create_verification("new@example.com", now + Duration::hours(1))
        .await;

    let old = now - Duration::days(60);
    app.create_report(None, "post", MISSING, ReportStatus::Resolved, old)
        .await;
    app.create_report(None, "post", MISSING, ReportStatus::Pending, old)
        .await;
    app.create_report(None, "post", MISSING, ReportStatus::Dismissed, now)
        .await;

    let p = app.create_post(None, &[]).await;
    app.create_like(None, Some(p), None).await;
    app.create_like(None, None, Some(MISSING)).await;

    let avatar = app
        .put_file(Bucket::Members, &format!("member_Ann_{TS}.png"))
        .await;
    let stray = app.create_band("Stray", Some(MISSING)).await;
    app.create_member("Ann", stray, None, Some(avatar)).await;

    app.put_file(Bucket::Avatars, &format!("{TS}_abandoned.png")).await;
}

#[tokio::test]
async fn full_run_clears_the_backlog() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    let config = CleanupConfig::default();

    let report = CleanupScheduler::new(&app.db, app.store.as_ref(), &config)
        .run_full()
        .await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.expired_verifications, 1);
    assert_eq!(report.old_reports, 1);
    assert_eq!(report.orphaned_likes, 1);
    assert_eq!(report.orphaned_user_data[&EntityKind::Band], 1);
    assert_eq!(report.orphaned_user_data[&EntityKind::Member], 1);
    assert!(
        report
            .orphaned_files
            .contains(&format!("members/member_Ann_{TS}.png"))
    );
    assert!(
        report
            .orphaned_files
            .contains(&format!("avatars/{TS}_abandoned.png"))
    );
    // Reports that survive the retention step still target a missing post.
    assert_eq!(report.orphaned_user_data[&EntityKind::Report], 2);
    assert_eq!(report.total_cleaned(), 1 + 1 + 1 + 4 + 2);

    assert_eq!(email_verification::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(report::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(like::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(band::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(member::Entity::find().count(&app.db).await.unwrap(), 0);
    assert!(!app.file_exists(Bucket::Avatars, &format!("{TS}_abandoned.png")));
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    let config = CleanupConfig::default();
    let scheduler = CleanupScheduler::new(&app.db, app.store.as_ref(), &config);

    scheduler.run_full().await;
    let again = scheduler.run_full().await;

    assert!(again.failures.is_empty());
    assert_eq!(again.total_cleaned(), 0);
}

#[tokio::test]
async fn quick_run_never_touches_files() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    let config = CleanupConfig::default();

    let report = CleanupScheduler::new(&app.db, app.store.as_ref(), &config)
        .run_quick()
        .await;

    assert!(report.orphaned_files.is_empty());
    assert_eq!(report.orphaned_user_data[&EntityKind::Band], 1);
    assert!(app.file_exists(Bucket::Members, &format!("member_Ann_{TS}.png")));
    assert!(app.file_exists(Bucket::Avatars, &format!("{TS}_abandoned.png")));
}

#[tokio::test]
async fn files_run_only_sweeps_buckets() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    let config = CleanupConfig::default();

    let report = CleanupScheduler::new(&app.db, app.store.as_ref(), &config)
        .run_files()
        .await;

    assert_eq!(report.expired_verifications, 0);
    assert!(report.orphaned_user_data.is_empty());
    // The stray member still references its avatar.
    assert_eq!(report.orphaned_files, vec![format!("avatars/{TS}_abandoned.png")]);
    assert_eq!(band::Entity::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn grace_period_applies_to_the_file_sweep() {
    let app = TestApp::spawn().await;
    app.put_file(Bucket::Avatars, &format!("{TS}_fresh.png")).await;
    let config = CleanupConfig {
        anonymous_grace_secs: 3600,
        ..Default::default()
    };

    let report = CleanupScheduler::new(&app.db, app.store.as_ref(), &config)
        .run_files()
        .await;

    assert!(report.orphaned_files.is_empty());
    assert!(app.file_exists(Bucket::Avatars, &format!("{TS}_fresh.png")));
}

#[tokio::test]
async fn failing_step_does_not_stop_the_others() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    app.db
        .execute_unprepared("DROP TABLE email_verification")
        .await
        .unwrap();
    let config = CleanupConfig::default();

    let report = CleanupScheduler::new(&app.db, app.store.as_ref(), &config)
        .run_full()
        .await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, CleanupStep::ExpiredVerifications);
    assert_eq!(report.old_reports, 1);
    assert_eq!(report.orphaned_likes, 1);
    assert_eq!(report.orphaned_user_data[&EntityKind::Band], 1);
}

#[tokio::test]
async fn status_reports_backlog_without_changes() {
    let app = TestApp::spawn().await;
    seed_backlog(&app).await;
    let config = CleanupConfig::default();
    let scheduler = CleanupScheduler::new(&app.db, app.store.as_ref(), &config);

    let status = scheduler.status().await.unwrap();

    assert_eq!(status.expired_verifications, 1);
    assert_eq!(status.old_reports, 1);
    assert_eq!(status.orphaned_likes, 1);
    assert_eq!(status.orphaned_rows[&EntityKind::Band], 1);
    assert_eq!(status.totals["band"], 1);
    assert_eq!(status.totals["report"], 3);
    assert_eq!(status.totals["email_verification"], 2);

    let again = scheduler.status().await.unwrap();
    assert_eq!(again.totals, status.totals);
}

#[tokio::test]
async fn exact_counts_then_zero_on_rerun() {
    let app = TestApp::spawn().await;
    let now = Utc::now();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        app.create_verification(email, now - Duration::minutes(5)).await;
    }
    let p = app.create_post(None, &[]).await;
    let old = now - Duration::days(45);
    app.create_report(None, "post", p, ReportStatus::Dismissed, old).await;
    app.create_report(None, "post", p, ReportStatus::Dismissed, old).await;
    let c = app.create_comment(p, None, None).await;
    app.create_like(None, None, Some(c)).await;
    app.db
        .execute_unprepared(&format!("DELETE FROM comment WHERE id = {c}"))
        .await
        .unwrap();
    let config = CleanupConfig::default();
    let scheduler = CleanupScheduler::new(&app.db, app.store.as_ref(), &config);

    let report = scheduler.run_full().await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.expired_verifications, 3);
    assert_eq!(report.old_reports, 2);
    assert_eq!(report.orphaned_likes, 1);
    assert!(report.orphaned_user_data.is_empty());
    assert_eq!(report.total_cleaned(), 6);

    let again = scheduler.run_full().await;
    assert!(again.failures.is_empty());
    assert_eq!(again.expired_verifications, 0);
    assert_eq!(again.old_reports, 0);
    assert_eq!(again.orphaned_likes, 0);
    assert_eq!(again.total_cleaned(), 0);
}

#[tokio::test]
async fn comment_left_behind_by_a_raw_post_delete_is_removed() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", None).await;
    let p = app.create_post(Some(alice), &[]).await;
    let c = app.create_comment(p, None, Some(alice)).await;
    app.create_like(Some(alice), None, Some(c)).await;
    app.db
        .execute_unprepared(&format!("DELETE FROM post WHERE id = {p}"))
        .await
        .unwrap();
    let config = CleanupConfig::default();
    let scheduler = CleanupScheduler::new(&app.db, app.store.as_ref(), &config);

    let report = scheduler.run_full().await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.orphaned_user_data[&EntityKind::Comment], 1);
    assert_eq!(report.orphaned_user_data[&EntityKind::Like], 1);
    assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(like::Entity::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(user::Entity::find().count(&app.db).await.unwrap(), 1);

    assert_eq!(scheduler.run_full().await.total_cleaned(), 0);
}

#[tokio::test]
async fn invalid_retention_fails_only_its_step() {
    let app = TestApp::spawn().await;
    let p = app.create_post(None, &[]).await;
    let old = Utc::now() - Duration::days(400);
    app.create_report(None, "post", p, ReportStatus::Resolved, old).await;

    for days in [-1, i64::MAX] {
        let config = CleanupConfig {
            report_retention_days: days,
            ..Default::default()
        };
        let scheduler = CleanupScheduler::new(&app.db, app.store.as_ref(), &config);

        let report = scheduler.run_quick().await;

        assert_eq!(report.failures.len(), 1, "{:?}", report.failures);
        assert_eq!(report.failures[0].step, CleanupStep::OldReports);
        assert_eq!(report.failures[0].reason, FailureReason::ConfigError);
        assert_eq!(report.old_reports, 0);
        assert!(scheduler.status().await.is_err());
    }

    let kept = report::Entity::find()
        .filter(report::Column::Status.is_in(ReportStatus::TERMINAL.iter().copied()))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(kept, 1);
}
