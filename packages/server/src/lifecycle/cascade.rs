use std::collections::{BTreeMap, HashMap};

use common::{Bucket, MediaStore};
use sea_orm::{ConnectionTrait, TransactionSession, TransactionTrait};
use tracing::{info, warn};

use super::error::{FailureReason, LifecycleError};
use super::gc::{GarbageCollector, ReclaimScope, SkippedFile};
use super::graph::{EntityKind, EntityRef, SubtreePlan, SubtreeWalk};
use super::store::{self, OwnedMedia};

/// Outcome of deleting one root and its descendants.
#[derive(Debug, Clone)]
pub struct DeletionResult {
    pub target: EntityRef,
    /// Rows deleted per kind, root included.
    pub deleted: BTreeMap<EntityKind, u64>,
    /// Reclaimed files as `bucket/filename`.
    pub reclaimed: Vec<String>,
    /// Files that could not be reclaimed. The rows are gone regardless.
    pub skipped: Vec<SkippedFile>,
}

impl DeletionResult {
    pub fn total_deleted(&self) -> u64 {
        self.deleted.values().sum()
    }
}

/// An item of a batch that was not deleted.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub target: EntityRef,
    pub reason: FailureReason,
    pub message: String,
}

/// Per-item breakdown of a batch deletion.
#[derive(Debug, Clone, Default)]
pub struct BatchDeletion {
    pub results: Vec<DeletionResult>,
    pub not_found: Vec<EntityRef>,
    pub failures: Vec<ItemFailure>,
}

impl BatchDeletion {
    /// Record an item that was not deleted.
    pub fn reject(&mut self, target: EntityRef, err: LifecycleError) {
        match err {
            LifecycleError::NotFound(_) => self.not_found.push(target),
            other => self.failures.push(ItemFailure {
                target,
                reason: other.reason(),
                message: other.to_string(),
            }),
        }
    }

    pub fn deleted_counts(&self) -> BTreeMap<EntityKind, u64> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            for (kind, n) in &result.deleted {
                *counts.entry(*kind).or_insert(0) += n;
            }
        }
        counts
    }
}

/// Deletes a row together with everything it owns.
///
/// Rows are planned and deleted inside one transaction, children first. Media
/// of the deleted rows is reclaimed after commit with a scoped sweep.
pub struct CascadeDeleter<'a, C> {
    conn: &'a C,
    store: &'a dyn MediaStore,
    reclaim: bool,
}

impl<'a, C> CascadeDeleter<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C, store: &'a dyn MediaStore) -> Self {
        Self {
            conn,
            store,
            reclaim: true,
        }
    }

    /// Delete rows only, leaving every file in place.
    pub fn without_reclamation(mut self) -> Self {
        self.reclaim = false;
        self
    }

    /// Delete `target` and its subtree.
    ///
    /// Returns `NotFound` without touching anything when the row is already
    /// gone. A database failure rolls the whole subtree back.
    pub async fn delete(&self, target: EntityRef) -> Result<DeletionResult, LifecycleError> {
        let txn = self.conn.begin().await?;

        if !store::exists(&txn, target).await? {
            return Err(LifecycleError::NotFound(target));
        }

        let plan = plan_subtree(&txn, target).await?;
        let media = collect_media(&txn, &plan).await?;
        let scopes = build_scopes(&txn, &plan, media).await?;

        let mut deleted = BTreeMap::new();
        for (kind, ids) in plan.batches() {
            let n = store::delete_ids(&txn, kind, &ids).await?;
            *deleted.entry(kind).or_insert(0) += n;
        }

        txn.commit().await?;

        info!(
            entity = %target,
            rows = plan.len(),
            "Deleted entity and descendants"
        );

        let mut result = DeletionResult {
            target,
            deleted,
            reclaimed: Vec::new(),
            skipped: Vec::new(),
        };
        if self.reclaim {
            self.reclaim_media(&scopes, &mut result).await;
        }
        Ok(result)
    }

    /// Delete each target independently, in order. One item failing does not
    /// affect the others.
    pub async fn delete_many(&self, targets: &[EntityRef]) -> BatchDeletion {
        let mut batch = BatchDeletion::default();
        for &target in targets {
            match self.delete(target).await {
                Ok(result) => batch.results.push(result),
                Err(e) => {
                    if !matches!(e, LifecycleError::NotFound(_)) {
                        warn!(entity = %target, error = %e, "Batch item failed");
                    }
                    batch.reject(target, e);
                }
            }
        }
        batch
    }

    async fn reclaim_media(
        &self,
        scopes: &BTreeMap<Bucket, ReclaimScope>,
        result: &mut DeletionResult,
    ) {
        let gc = GarbageCollector::new(self.conn, self.store);
        for (bucket, scope) in scopes {
            match gc.sweep_scoped(*bucket, scope).await {
                Ok(report) => {
                    result
                        .reclaimed
                        .extend(report.deleted.iter().map(|f| format!("{bucket}/{f}")));
                    result.skipped.extend(report.skipped);
                }
                Err(e) => {
                    warn!(
                        entity = %result.target,
                        bucket = %bucket,
                        error = %e,
                        "Media reclamation failed"
                    );
                    result.skipped.push(SkippedFile {
                        bucket: *bucket,
                        filename: String::new(),
                        reason: e.reason(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Depth-first walk from `root` over every ownership edge.
pub async fn plan_subtree<C: ConnectionTrait>(
    conn: &C,
    root: EntityRef,
) -> Result<SubtreePlan, LifecycleError> {
    let mut walk = SubtreeWalk::new(root);
    while let Some(entity) = walk.next_entity() {
        let children = store::children(conn, entity).await?;
        walk.expand(children);
    }
    Ok(walk.finish())
}

async fn collect_media<C: ConnectionTrait>(
    conn: &C,
    plan: &SubtreePlan,
) -> Result<Vec<OwnedMedia>, LifecycleError> {
    let mut media = Vec::new();
    for &kind in EntityKind::ALL {
        if kind.bucket().is_none() {
            continue;
        }
        media.extend(store::media_of(conn, kind, &plan.ids_of(kind)).await?);
    }
    Ok(media)
}

/// One scope per bucket touched by the plan. Read before the rows are deleted.
async fn build_scopes<C: ConnectionTrait>(
    conn: &C,
    plan: &SubtreePlan,
    media: Vec<OwnedMedia>,
) -> Result<BTreeMap<Bucket, ReclaimScope>, LifecycleError> {
    let mut scopes: BTreeMap<Bucket, ReclaimScope> = BTreeMap::new();

    for &kind in EntityKind::ALL {
        let Some(bucket) = kind.bucket() else {
            continue;
        };
        let ids = plan.ids_of(kind);
        if ids.is_empty() {
            continue;
        }
        let slugs: HashMap<i32, String> = store::slugs(conn, kind, &ids).await?;
        let scope = scopes.entry(bucket).or_default();
        scope.slugs.extend(slugs.into_values());
        scope
            .owners
            .extend(ids.into_iter().map(|id| EntityRef::new(kind, id)));
    }

    for item in media {
        scopes
            .entry(item.bucket)
            .or_default()
            .files
            .insert(item.filename);
    }
    Ok(scopes)
}
