use std::collections::{BTreeMap, BTreeSet};

use sea_orm::{ConnectionTrait, DbErr};
use tracing::debug;

use super::graph::{EDGES, EntityKind, EntityRef, parents_of};
use super::store;

/// Finds rows whose owner or parent no longer exists.
///
/// Read-only. Every ownership edge is checked with an anti-join, so a row is
/// an orphan as soon as any one of its links dangles.
pub struct OrphanScanner<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrphanScanner<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Orphaned row ids per kind. Kinds without orphans are absent.
    pub async fn find_orphans(&self) -> Result<BTreeMap<EntityKind, Vec<i32>>, DbErr> {
        let mut found: BTreeMap<EntityKind, BTreeSet<i32>> = BTreeMap::new();
        for edge in EDGES {
            let ids = store::dangling(self.conn, edge).await?;
            if ids.is_empty() {
                continue;
            }
            debug!(
                parent = %edge.parent,
                child = %edge.child,
                count = ids.len(),
                "Dangling ownership links"
            );
            found.entry(edge.child).or_default().extend(ids);
        }
        Ok(found
            .into_iter()
            .map(|(kind, ids)| (kind, ids.into_iter().collect()))
            .collect())
    }

    /// Orphan counts per kind, zero included.
    pub async fn count_orphans(&self) -> Result<BTreeMap<EntityKind, u64>, DbErr> {
        let orphans = self.find_orphans().await?;
        Ok(EntityKind::ALL
            .iter()
            .filter(|k| parents_of(**k).next().is_some())
            .map(|k| (*k, orphans.get(k).map_or(0, |ids| ids.len() as u64)))
            .collect())
    }

    /// Likes whose post or comment is gone. A missing user alone does not count.
    pub async fn dangling_likes(&self) -> Result<Vec<i32>, DbErr> {
        let mut ids = BTreeSet::new();
        for edge in parents_of(EntityKind::Like).filter(|e| e.parent != EntityKind::User) {
            ids.extend(store::dangling(self.conn, edge).await?);
        }
        Ok(ids.into_iter().collect())
    }
}

/// Flatten scan results into deletion targets, in `EntityKind` order.
pub fn orphan_targets(orphans: &BTreeMap<EntityKind, Vec<i32>>) -> Vec<EntityRef> {
    orphans
        .iter()
        .flat_map(|(kind, ids)| ids.iter().map(|id| EntityRef::new(*kind, *id)))
        .collect()
}
