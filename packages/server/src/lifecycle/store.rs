//! Persistence adapter for the ownership graph.
//!
//! Graph edges and media fields name their columns as strings; this module
//! resolves them against the SeaORM entity of each kind and runs the queries.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use common::Bucket;
use common::storage::media_filename;
use common::storage::name::slugify;
use sea_orm::sea_query::{Alias, LikeExpr, Query as SeaQuery};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityName, EntityTrait, QueryFilter,
    QuerySelect,
};
use tracing::warn;

use crate::entity::{band, comment, event, like, member, post, report, user};
use crate::models::shared::escape_like;

use super::graph::{Edge, EntityKind, EntityRef, Link, MediaField};

/// Run a generic helper against the entity backing `$kind`.
macro_rules! for_kind {
    ($kind:expr, $f:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            EntityKind::User => $f::<user::Entity, _>($($arg),*).await,
            EntityKind::Band => $f::<band::Entity, _>($($arg),*).await,
            EntityKind::Member => $f::<member::Entity, _>($($arg),*).await,
            EntityKind::Event => $f::<event::Entity, _>($($arg),*).await,
            EntityKind::Post => $f::<post::Entity, _>($($arg),*).await,
            EntityKind::Comment => $f::<comment::Entity, _>($($arg),*).await,
            EntityKind::Like => $f::<like::Entity, _>($($arg),*).await,
            EntityKind::Report => $f::<report::Entity, _>($($arg),*).await,
        }
    };
}

/// A media file referenced by a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedMedia {
    pub owner: EntityRef,
    pub bucket: Bucket,
    pub filename: String,
}

fn column<E: EntityTrait>(name: &str) -> Result<E::Column, DbErr> {
    E::Column::from_str(name).map_err(|_| {
        DbErr::Custom(format!(
            "unknown column {}.{}",
            EntityName::table_name(&E::default()),
            name
        ))
    })
}

fn link_condition<E: EntityTrait>(link: Link, parents: &[i32]) -> Result<Condition, DbErr> {
    Ok(match link {
        Link::Column(name) => Condition::all().add(column::<E>(name)?.is_in(parents.to_vec())),
        Link::Target(tag) => Condition::all()
            .add(column::<E>("target_type")?.eq(tag))
            .add(column::<E>("target_id")?.is_in(parents.to_vec())),
    })
}

/// Rows whose link names a parent id missing from the parent table.
fn dangling_condition<E: EntityTrait>(edge: &Edge) -> Result<Condition, DbErr> {
    let live_parents = SeaQuery::select()
        .column(Alias::new("id"))
        .from(Alias::new(edge.parent.table()))
        .to_owned();

    Ok(match edge.link {
        Link::Column(name) => {
            let col = column::<E>(name)?;
            Condition::all()
                .add(col.is_not_null())
                .add(col.not_in_subquery(live_parents))
        }
        Link::Target(tag) => Condition::all()
            .add(column::<E>("target_type")?.eq(tag))
            .add(column::<E>("target_id")?.not_in_subquery(live_parents)),
    })
}

async fn select_ids<E, C>(conn: &C, cond: Condition) -> Result<Vec<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    E::find()
        .select_only()
        .column(column::<E>("id")?)
        .filter(cond)
        .into_tuple::<i32>()
        .all(conn)
        .await
}

async fn delete_where<E, C>(conn: &C, ids: &[i32]) -> Result<u64, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let res = E::delete_many()
        .filter(column::<E>("id")?.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

async fn linked_ids<E, C>(conn: &C, link: Link, parents: &[i32]) -> Result<Vec<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    select_ids::<E, C>(conn, link_condition::<E>(link, parents)?).await
}

async fn dangling_ids<E, C>(conn: &C, edge: &Edge) -> Result<Vec<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    select_ids::<E, C>(conn, dangling_condition::<E>(edge)?).await
}

async fn owner_of_row<E, C>(
    conn: &C,
    kind: EntityKind,
    id: i32,
) -> Result<Option<Option<i32>>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    E::find()
        .select_only()
        .column(column::<E>(kind.owner_column())?)
        .filter(column::<E>("id")?.eq(id))
        .into_tuple::<Option<i32>>()
        .one(conn)
        .await
}

async fn slugs_of<E, C>(
    conn: &C,
    kind: EntityKind,
    ids: &[i32],
) -> Result<Vec<(i32, String)>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let Some(slug_col) = kind.slug_column() else {
        let existing = select_ids::<E, C>(
            conn,
            Condition::all().add(column::<E>("id")?.is_in(ids.to_vec())),
        )
        .await?;
        return Ok(existing.into_iter().map(|id| (id, id.to_string())).collect());
    };
    let rows: Vec<(i32, String)> = E::find()
        .select_only()
        .column(column::<E>("id")?)
        .column(column::<E>(slug_col)?)
        .filter(column::<E>("id")?.is_in(ids.to_vec()))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| (id, slugify(&name)))
        .collect())
}

async fn live_slug_values<E, C>(conn: &C, kind: EntityKind) -> Result<Vec<String>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let mut cond = Condition::all();
    if let Some(flag) = kind.soft_delete_column() {
        cond = cond.add(column::<E>(flag)?.eq(false));
    }
    match kind.slug_column() {
        Some(slug_col) => {
            let names: Vec<String> = E::find()
                .select_only()
                .column(column::<E>(slug_col)?)
                .filter(cond)
                .into_tuple()
                .all(conn)
                .await?;
            Ok(names.iter().map(|n| slugify(n)).collect())
        }
        None => Ok(select_ids::<E, C>(conn, cond)
            .await?
            .into_iter()
            .map(|id| id.to_string())
            .collect()),
    }
}

/// `(id, raw value)` of a media column, for live rows only.
///
/// `ids` restricts the rows; `contains` keeps only values containing the string.
async fn media_values<E, C>(
    conn: &C,
    field: &MediaField,
    ids: Option<&[i32]>,
    contains: Option<&str>,
) -> Result<Vec<(i32, String)>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let media_col = column::<E>(field.column)?;
    let mut cond = Condition::all().add(media_col.is_not_null());
    if let Some(ids) = ids {
        cond = cond.add(column::<E>("id")?.is_in(ids.to_vec()));
    } else if let Some(flag) = field.kind.soft_delete_column() {
        cond = cond.add(column::<E>(flag)?.eq(false));
    }
    if let Some(needle) = contains {
        cond = cond.add(
            media_col.like(LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\')),
        );
    }

    let rows: Vec<(i32, Option<String>)> = E::find()
        .select_only()
        .column(column::<E>("id")?)
        .column(media_col)
        .filter(cond)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, value)| value.map(|v| (id, v)))
        .collect())
}

/// Split a raw column value into the filenames it references.
///
/// `None` when a list column does not hold a JSON array. Non-string array
/// elements are ignored; the strings around them still count.
pub fn filenames_in(field: &MediaField, raw: &str) -> Option<Vec<String>> {
    if !field.list {
        return Some(media_filename(raw).map(str::to_string).into_iter().collect());
    }
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => Some(
            values
                .iter()
                .filter_map(serde_json::Value::as_str)
                .filter_map(media_filename)
                .map(str::to_string)
                .collect(),
        ),
        Err(e) => {
            warn!(column = field.column, error = %e, "Media list is not a JSON array");
            None
        }
    }
}

/// Like [`filenames_in`], reading an unparseable list as a single URL.
pub fn filenames_or_raw(field: &MediaField, raw: &str) -> Vec<String> {
    filenames_in(field, raw)
        .unwrap_or_else(|| media_filename(raw).map(str::to_string).into_iter().collect())
}

/// Whether the row exists.
pub async fn exists<C: ConnectionTrait>(conn: &C, entity: EntityRef) -> Result<bool, DbErr> {
    Ok(owner_of(conn, entity).await?.is_some())
}

/// Owner id of a row: `None` if the row does not exist, `Some(None)` if it has no owner.
pub async fn owner_of<C: ConnectionTrait>(
    conn: &C,
    entity: EntityRef,
) -> Result<Option<Option<i32>>, DbErr> {
    for_kind!(entity.kind, owner_of_row(conn, entity.kind, entity.id))
}

/// Rows directly owned by `entity`, across every outgoing edge.
pub async fn children<C: ConnectionTrait>(
    conn: &C,
    entity: EntityRef,
) -> Result<Vec<EntityRef>, DbErr> {
    let mut found = Vec::new();
    for edge in super::graph::children_of(entity.kind) {
        let parents = [entity.id];
        let ids = for_kind!(edge.child, linked_ids(conn, edge.link, &parents))?;
        found.extend(ids.into_iter().map(|id| EntityRef::new(edge.child, id)));
    }
    Ok(found)
}

/// Child rows of `edge` whose parent no longer exists.
pub async fn dangling<C: ConnectionTrait>(conn: &C, edge: &Edge) -> Result<Vec<i32>, DbErr> {
    for_kind!(edge.child, dangling_ids(conn, edge))
}

/// Delete rows of `kind` by id.
pub async fn delete_ids<C: ConnectionTrait>(
    conn: &C,
    kind: EntityKind,
    ids: &[i32],
) -> Result<u64, DbErr> {
    if ids.is_empty() {
        return Ok(0);
    }
    for_kind!(kind, delete_where(conn, ids))
}

/// Media referenced by the given rows of `kind`, regardless of soft deletion.
pub async fn media_of<C: ConnectionTrait>(
    conn: &C,
    kind: EntityKind,
    ids: &[i32],
) -> Result<Vec<OwnedMedia>, DbErr> {
    let mut media = Vec::new();
    if ids.is_empty() {
        return Ok(media);
    }
    for field in super::graph::media_fields_of(kind) {
        let rows = for_kind!(kind, media_values(conn, field, Some(ids), None))?;
        for (id, raw) in rows {
            for filename in filenames_or_raw(field, &raw) {
                media.push(OwnedMedia {
                    owner: EntityRef::new(kind, id),
                    bucket: field.bucket,
                    filename,
                });
            }
        }
    }
    Ok(media)
}

/// Slugs of the given rows, as embedded in named uploads.
pub async fn slugs<C: ConnectionTrait>(
    conn: &C,
    kind: EntityKind,
    ids: &[i32],
) -> Result<HashMap<i32, String>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = for_kind!(kind, slugs_of(conn, kind, ids))?;
    Ok(rows.into_iter().collect())
}

/// Slugs of every live row of `kind`.
pub async fn live_slugs<C: ConnectionTrait>(
    conn: &C,
    kind: EntityKind,
) -> Result<HashSet<String>, DbErr> {
    let values = for_kind!(kind, live_slug_values(conn, kind))?;
    Ok(values.into_iter().collect())
}

/// Raw media values of live rows in one field, optionally narrowed to those
/// containing `contains`.
pub async fn live_media<C: ConnectionTrait>(
    conn: &C,
    field: &MediaField,
    contains: Option<&str>,
) -> Result<Vec<String>, DbErr> {
    let rows = for_kind!(field.kind, media_values(conn, field, None, contains))?;
    Ok(rows.into_iter().map(|(_, raw)| raw).collect())
}
