use std::io;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::ConnectionTrait;

use bandhub::lifecycle::index::{self, BlobReferenceIndex};
use bandhub::lifecycle::{
    BlobLedger, CascadeDeleter, EntityKind, EntityRef, FailureReason, GarbageCollector,
    ReclaimScope,
};
use common::{Bucket, MediaStore, StorageError, StoredFile};

use crate::common::{TS, TestApp};

/// Lists like the real store but refuses to unlink anything.
struct ReadOnlyStore<'a>(&'a dyn MediaStore);

#[async_trait]
impl MediaStore for ReadOnlyStore<'_> {
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredFile>, StorageError> {
        self.0.list(bucket).await
    }

    async fn exists(&self, bucket: Bucket, filename: &str) -> Result<bool, StorageError> {
        self.0.exists(bucket, filename).await
    }

    async fn put(&self, bucket: Bucket, filename: &str, data: &[u8]) -> Result<(), StorageError> {
        self.0.put(bucket, filename, data).await
    }

    async fn remove(&self, _bucket: Bucket, _filename: &str) -> Result<bool, StorageError> {
        Err(StorageError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}

mod reference_index {
    use super::*;

    #[tokio::test]
    async fn collects_every_media_column_of_the_bucket() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", None).await;
        app.create_band_with_media(
            "Rockers",
            Some(alice),
            Some("/uploads/bands/banner.png".into()),
            Some("https://cdn.example.com/uploads/bands/profile.png?v=2".into()),
        )
        .await;
        app.create_post(
            Some(alice),
            &["/uploads/community/a.png".into(), "/uploads/community/b.png".into()],
        )
        .await;

        let bands = BlobReferenceIndex::build(&app.db, Bucket::Bands).await.unwrap();
        assert!(bands.contains("banner.png"));
        assert!(bands.contains("profile.png"));
        assert_eq!(bands.len(), 2);

        let community = BlobReferenceIndex::build(&app.db, Bucket::Community)
            .await
            .unwrap();
        assert!(community.contains("a.png"));
        assert!(community.contains("b.png"));

        let avatars = BlobReferenceIndex::build(&app.db, Bucket::Avatars).await.unwrap();
        assert!(avatars.is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_events_do_not_protect_posters() {
        let app = TestApp::spawn().await;
        app.create_event("Live", None, None, Some("/uploads/events/live.png".into()))
            .await;
        let gone = app
            .create_event("Gone", None, None, Some("/uploads/events/gone.png".into()))
            .await;
        app.db
            .execute_unprepared(&format!("UPDATE event SET is_deleted = 1 WHERE id = {gone}"))
            .await
            .unwrap();

        let events = BlobReferenceIndex::build(&app.db, Bucket::Events).await.unwrap();
        assert!(events.contains("live.png"));
        assert!(!events.contains("gone.png"));
    }

    #[tokio::test]
    async fn malformed_image_list_stays_protected() {
        let app = TestApp::spawn().await;
        let p = app.create_post(None, &[]).await;
        app.db
            .execute_unprepared(&format!(
                "UPDATE post SET image_urls = '/uploads/community/raw.png' WHERE id = {p}"
            ))
            .await
            .unwrap();

        assert!(
            index::is_referenced(&app.db, Bucket::Community, "raw.png")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn targeted_check_treats_like_wildcards_literally() {
        let app = TestApp::spawn().await;
        app.create_user("alice", Some("/uploads/avatars/a_b.png".into()))
            .await;

        assert!(
            index::is_referenced(&app.db, Bucket::Avatars, "a_b.png")
                .await
                .unwrap()
        );
        assert!(
            !index::is_referenced(&app.db, Bucket::Avatars, "aXb.png")
                .await
                .unwrap()
        );
        assert!(
            !index::is_referenced(&app.db, Bucket::Avatars, "b.png")
                .await
                .unwrap()
        );
    }
}

mod aggressive_sweep {
    use super::*;

    #[tokio::test]
    async fn reclaims_unreferenced_images_only() {
        let app = TestApp::spawn().await;
        let kept = app.put_file(Bucket::Bands, "kept.png").await;
        app.create_band_with_media("Rockers", None, Some(kept), None).await;
        app.put_file(Bucket::Bands, &format!("band_Ghosts_{TS}.png")).await;
        app.put_file(Bucket::Bands, &format!("{TS}_flyer.jpg")).await;
        app.put_file(Bucket::Bands, "notes.txt").await;

        let report = GarbageCollector::new(&app.db, app.store.as_ref())
            .sweep(Bucket::Bands)
            .await
            .unwrap();

        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(
            deleted,
            vec![format!("band_Ghosts_{TS}.png"), format!("{TS}_flyer.jpg")]
        );
        assert_eq!(report.kept, 1);
        assert!(app.file_exists(Bucket::Bands, "kept.png"));
        assert!(app.file_exists(Bucket::Bands, "notes.txt"));
    }

    #[tokio::test]
    async fn image_lists_with_non_string_entries_still_protect_their_files() {
        let app = TestApp::spawn().await;
        app.put_file(Bucket::Community, "keep.png").await;
        app.put_file(Bucket::Community, "odd.png").await;
        app.put_file(Bucket::Community, "stray.png").await;
        let mixed = app.create_post(None, &[]).await;
        let broken = app.create_post(None, &[]).await;
        app.db
            .execute_unprepared(&format!(
                r#"UPDATE post SET image_urls = '["/uploads/community/keep.png", null]'
                   WHERE id = {mixed}"#
            ))
            .await
            .unwrap();
        app.db
            .execute_unprepared(&format!(
                r#"UPDATE post SET image_urls = '["/uploads/community/odd.png", '
                   WHERE id = {broken}"#
            ))
            .await
            .unwrap();

        let community = BlobReferenceIndex::build(&app.db, Bucket::Community)
            .await
            .unwrap();
        assert!(community.contains("keep.png"));
        assert!(
            index::is_referenced(&app.db, Bucket::Community, "odd.png")
                .await
                .unwrap()
        );

        let report = GarbageCollector::new(&app.db, app.store.as_ref())
            .sweep(Bucket::Community)
            .await
            .unwrap();

        assert_eq!(report.deleted, vec!["stray.png".to_string()]);
        assert!(app.file_exists(Bucket::Community, "keep.png"));
        assert!(app.file_exists(Bucket::Community, "odd.png"));
    }

    #[tokio::test]
    async fn grace_period_spares_fresh_uploads() {
        let app = TestApp::spawn().await;
        app.put_file(Bucket::Community, &format!("{TS}_fresh.png")).await;

        let report = GarbageCollector::new(&app.db, app.store.as_ref())
            .with_grace_period(Duration::from_secs(3600))
            .sweep(Bucket::Community)
            .await
            .unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.kept, 1);
        assert!(app.file_exists(Bucket::Community, &format!("{TS}_fresh.png")));
    }

    #[tokio::test]
    async fn second_sweep_finds_nothing() {
        let app = TestApp::spawn().await;
        app.put_file(Bucket::Avatars, "orphan.png").await;
        let gc = GarbageCollector::new(&app.db, app.store.as_ref());

        assert_eq!(gc.sweep(Bucket::Avatars).await.unwrap().deleted.len(), 1);
        let again = gc.sweep(Bucket::Avatars).await.unwrap();
        assert!(again.deleted.is_empty());
        assert!(again.skipped.is_empty());
    }

    #[tokio::test]
    async fn missing_bucket_directory_is_empty() {
        let app = TestApp::spawn().await;
        let results = GarbageCollector::new(&app.db, app.store.as_ref())
            .sweep_all()
            .await;

        assert_eq!(results.len(), Bucket::ALL.len());
        for (_, result) in results {
            assert!(result.unwrap().deleted.is_empty());
        }
    }

    #[tokio::test]
    async fn unlink_failures_are_skipped_not_raised() {
        let app = TestApp::spawn().await;
        app.put_file(Bucket::Avatars, "stuck.png").await;
        let store = ReadOnlyStore(app.store.as_ref());

        let report = GarbageCollector::new(&app.db, &store)
            .sweep(Bucket::Avatars)
            .await
            .unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].filename, "stuck.png");
        assert_eq!(report.skipped[0].reason, FailureReason::FileSystemError);
        assert!(app.file_exists(Bucket::Avatars, "stuck.png"));
    }
}

mod scoped_sweep {
    use super::*;

    #[tokio::test]
    async fn leaves_unrelated_anonymous_files_alone() {
        let app = TestApp::spawn().await;
        let banner = app.put_file(Bucket::Bands, &format!("band_Rockers_{TS}.png")).await;
        let rockers = app
            .create_band_with_media("Rockers", None, Some(banner), None)
            .await;
        // An older upload for the same band, no longer referenced.
        app.put_file(Bucket::Bands, "band_Rockers_20240101000000.png").await;
        // Someone else's pending upload.
        app.put_file(Bucket::Bands, &format!("{TS}_draft.png")).await;

        let result = CascadeDeleter::new(&app.db, app.store.as_ref())
            .delete(EntityRef::new(EntityKind::Band, rockers))
            .await
            .unwrap();

        assert_eq!(result.reclaimed.len(), 2);
        assert!(!app.file_exists(Bucket::Bands, &format!("band_Rockers_{TS}.png")));
        assert!(!app.file_exists(Bucket::Bands, "band_Rockers_20240101000000.png"));
        assert!(app.file_exists(Bucket::Bands, &format!("{TS}_draft.png")));
    }

    #[tokio::test]
    async fn shared_file_survives_while_another_row_uses_it() {
        let app = TestApp::spawn().await;
        let shared = app.put_file(Bucket::Bands, "shared.png").await;
        let a = app
            .create_band_with_media("A", None, Some(shared.clone()), None)
            .await;
        app.create_band_with_media("B", None, None, Some(shared)).await;

        let result = CascadeDeleter::new(&app.db, app.store.as_ref())
            .delete(EntityRef::new(EntityKind::Band, a))
            .await
            .unwrap();

        assert!(result.reclaimed.is_empty());
        assert!(app.file_exists(Bucket::Bands, "shared.png"));
    }

    #[tokio::test]
    async fn ledger_owned_anonymous_files_are_reclaimed() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice", None).await;
        let p = app.create_post(Some(alice), &[]).await;
        app.put_file(Bucket::Community, &format!("{TS}_unused.png")).await;
        app.put_file(Bucket::Community, &format!("{TS}_other.png")).await;
        BlobLedger::new(&app.db)
            .record(
                Bucket::Community,
                &format!("{TS}_unused.png"),
                EntityRef::new(EntityKind::Post, p),
            )
            .await
            .unwrap();

        CascadeDeleter::new(&app.db, app.store.as_ref())
            .delete(EntityRef::new(EntityKind::Post, p))
            .await
            .unwrap();

        assert!(!app.file_exists(Bucket::Community, &format!("{TS}_unused.png")));
        assert!(app.file_exists(Bucket::Community, &format!("{TS}_other.png")));
        let entries = BlobLedger::new(&app.db)
            .entries(Bucket::Community)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn slug_of_a_live_row_is_not_a_candidate() {
        let app = TestApp::spawn().await;
        app.create_band("Rockers", None).await;
        app.put_file(Bucket::Bands, &format!("band_Rockers_{TS}.png")).await;

        let mut scope = ReclaimScope::default();
        scope.slugs.insert("Rockers".into());
        let report = GarbageCollector::new(&app.db, app.store.as_ref())
            .sweep_scoped(Bucket::Bands, &scope)
            .await
            .unwrap();

        assert!(report.deleted.is_empty());
        assert!(app.file_exists(Bucket::Bands, &format!("band_Rockers_{TS}.png")));
    }
}
