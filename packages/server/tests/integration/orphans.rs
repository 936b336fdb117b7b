use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};

use bandhub::entity::report::ReportStatus;
use bandhub::entity::{band, comment, like, member};
use bandhub::lifecycle::{EntityKind, OrphanScanner};

use crate::common::TestApp;

const MISSING: i32 = 9_999;

#[tokio::test]
async fn finds_rows_whose_owner_or_parent_is_gone() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", None).await;

    let live_band = app.create_band("Live", Some(alice)).await;
    let stray_band = app.create_band("Stray", Some(MISSING)).await;
    let unowned_band = app.create_band("Unowned", None).await;
    let stray_member = app.create_member("Ann", MISSING, None, None).await;
    app.create_member("Ben", live_band, Some(alice), None).await;

    let p = app.create_post(Some(alice), &[]).await;
    let c = app.create_comment(p, None, Some(alice)).await;
    let stray_comment = app.create_comment(MISSING, None, Some(alice)).await;
    let stray_reply = app.create_comment(p, Some(MISSING), None).await;
    let stray_like = app.create_like(Some(alice), None, Some(MISSING)).await;
    app.create_like(Some(alice), Some(p), None).await;
    app.create_like(None, None, Some(c)).await;
    let stray_report = app
        .create_report(Some(alice), "post", MISSING, ReportStatus::Pending, chrono::Utc::now())
        .await;
    app.create_report(Some(alice), "comment", c, ReportStatus::Pending, chrono::Utc::now())
        .await;

    let orphans = OrphanScanner::new(&app.db).find_orphans().await.unwrap();

    assert_eq!(orphans[&EntityKind::Band], vec![stray_band]);
    assert_eq!(orphans[&EntityKind::Member], vec![stray_member]);
    assert_eq!(orphans[&EntityKind::Comment], vec![stray_comment, stray_reply]);
    assert_eq!(orphans[&EntityKind::Like], vec![stray_like]);
    assert_eq!(orphans[&EntityKind::Report], vec![stray_report]);
    assert!(!orphans.contains_key(&EntityKind::Post));
    assert!(!orphans[&EntityKind::Band].contains(&unowned_band));
}

#[tokio::test]
async fn deleted_user_leaves_orphans_behind() {
    let app = TestApp::spawn().await;
    let alice = app.create_user("alice", None).await;
    let b = app.create_band("Rockers", Some(alice)).await;
    app.create_member("Ann", b, Some(alice), None).await;
    app.db
        .execute_unprepared(&format!("DELETE FROM \"user\" WHERE id = {alice}"))
        .await
        .unwrap();

    let counts = OrphanScanner::new(&app.db).count_orphans().await.unwrap();

    assert_eq!(counts[&EntityKind::Band], 1);
    // Orphaned through its owner column, while its band still exists.
    assert_eq!(counts[&EntityKind::Member], 1);
    assert_eq!(counts[&EntityKind::Post], 0);
    assert!(!counts.contains_key(&EntityKind::User));
}

#[tokio::test]
async fn scanning_is_read_only() {
    let app = TestApp::spawn().await;
    app.create_band("Stray", Some(MISSING)).await;
    app.create_member("Ann", MISSING, None, None).await;
    app.create_like(None, Some(MISSING), None).await;

    let scanner = OrphanScanner::new(&app.db);
    let first = scanner.find_orphans().await.unwrap();
    let second = scanner.find_orphans().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(band::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(member::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(like::Entity::find().count(&app.db).await.unwrap(), 1);
    assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn dangling_likes_ignore_missing_users() {
    let app = TestApp::spawn().await;
    let p = app.create_post(None, &[]).await;
    app.create_like(Some(MISSING), Some(p), None).await;
    let stray = app.create_like(None, Some(MISSING), None).await;

    let likes = OrphanScanner::new(&app.db).dangling_likes().await.unwrap();

    assert_eq!(likes, vec![stray]);
}
