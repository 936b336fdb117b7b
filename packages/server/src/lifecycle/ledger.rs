use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use common::Bucket;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::media_blob;

use super::graph::{EntityKind, EntityRef};

/// Structured ownership metadata stored next to each media file.
///
/// Files without an entry fall back to filename conventions.
pub struct BlobLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> BlobLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Record (or re-record) who uploaded `filename` into `bucket`.
    pub async fn record(
        &self,
        bucket: Bucket,
        filename: &str,
        owner: EntityRef,
    ) -> Result<(), DbErr> {
        let model = media_blob::ActiveModel {
            id: Set(Uuid::now_v7()),
            bucket: Set(bucket.as_str().to_string()),
            filename: Set(filename.to_string()),
            owner_kind: Set(owner.kind.as_str().to_string()),
            owner_id: Set(owner.id),
            uploaded_at: Set(Utc::now()),
        };

        media_blob::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([media_blob::Column::Bucket, media_blob::Column::Filename])
                    .update_columns([
                        media_blob::Column::OwnerKind,
                        media_blob::Column::OwnerId,
                        media_blob::Column::UploadedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    /// Filenames in `bucket` recorded as owned by any of `owners`.
    pub async fn owned_by(
        &self,
        bucket: Bucket,
        owners: &[EntityRef],
    ) -> Result<HashSet<String>, DbErr> {
        if owners.is_empty() {
            return Ok(HashSet::new());
        }

        let mut by_kind: BTreeMap<EntityKind, Vec<i32>> = BTreeMap::new();
        for owner in owners {
            by_kind.entry(owner.kind).or_default().push(owner.id);
        }
        let mut any_owner = Condition::any();
        for (kind, ids) in by_kind {
            any_owner = any_owner.add(
                Condition::all()
                    .add(media_blob::Column::OwnerKind.eq(kind.as_str()))
                    .add(media_blob::Column::OwnerId.is_in(ids)),
            );
        }

        let rows = media_blob::Entity::find()
            .filter(media_blob::Column::Bucket.eq(bucket.as_str()))
            .filter(any_owner)
            .all(self.conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.filename).collect())
    }

    /// Every entry in `bucket`, keyed by filename.
    pub async fn entries(
        &self,
        bucket: Bucket,
    ) -> Result<HashMap<String, media_blob::Model>, DbErr> {
        let rows = media_blob::Entity::find()
            .filter(media_blob::Column::Bucket.eq(bucket.as_str()))
            .all(self.conn)
            .await?;
        Ok(rows.into_iter().map(|r| (r.filename.clone(), r)).collect())
    }

    /// Drop the entry for a file that no longer exists.
    pub async fn forget(&self, bucket: Bucket, filename: &str) -> Result<u64, DbErr> {
        let res = media_blob::Entity::delete_many()
            .filter(media_blob::Column::Bucket.eq(bucket.as_str()))
            .filter(media_blob::Column::Filename.eq(filename))
            .exec(self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}
