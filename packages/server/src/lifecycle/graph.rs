//! Static ownership graph and the arena used to plan a cascade.
//!
//! Nothing here touches the database. `EDGES` lists every parent → child link
//! by column name; `SubtreeWalk` turns a root plus a way to fetch children into
//! a `SubtreePlan` whose post-order is the deletion order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use common::Bucket;
use serde::{Deserialize, Serialize};

/// Every entity type that takes part in ownership.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Band,
    Member,
    Event,
    Post,
    Comment,
    Like,
    Report,
}

impl EntityKind {
    pub const ALL: &'static [EntityKind] = &[
        Self::User,
        Self::Band,
        Self::Member,
        Self::Event,
        Self::Post,
        Self::Comment,
        Self::Like,
        Self::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Band => "band",
            Self::Member => "member",
            Self::Event => "event",
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Like => "like",
            Self::Report => "report",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Column naming the account a row belongs to. For users, the row itself.
    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::User => "id",
            Self::Band | Self::Member | Self::Event => "owner_id",
            Self::Post | Self::Comment => "author_id",
            Self::Like => "user_id",
            Self::Report => "reporter_id",
        }
    }

    /// Column whose slugified value appears in named uploads. Posts use their id.
    pub fn slug_column(&self) -> Option<&'static str> {
        match self {
            Self::User => Some("username"),
            Self::Band | Self::Member => Some("name"),
            Self::Event => Some("title"),
            _ => None,
        }
    }

    /// Boolean column marking soft-deleted rows, which count as not live.
    pub fn soft_delete_column(&self) -> Option<&'static str> {
        match self {
            Self::Event => Some("is_deleted"),
            _ => None,
        }
    }

    /// The kind whose uploads are stored in `bucket`.
    pub fn for_bucket(bucket: Bucket) -> EntityKind {
        match bucket {
            Bucket::Avatars => Self::User,
            Bucket::Bands => Self::Band,
            Bucket::Members => Self::Member,
            Bucket::Events => Self::Event,
            Bucket::Community => Self::Post,
        }
    }

    /// The bucket this kind uploads into, if it carries media.
    pub fn bucket(&self) -> Option<Bucket> {
        MEDIA_FIELDS
            .iter()
            .find(|f| f.kind == *self)
            .map(|f| f.bucket)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Invalid entity kind '{s}'"))
    }
}

/// Reference to one row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: i32,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: i32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// How a child row points at its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    /// The child column holds the parent id.
    Column(&'static str),
    /// `target_type = <tag>` and `target_id` holds the parent id.
    Target(&'static str),
}

/// A parent → child ownership edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub parent: EntityKind,
    pub child: EntityKind,
    pub link: Link,
}

const fn edge(parent: EntityKind, child: EntityKind, link: Link) -> Edge {
    Edge {
        parent,
        child,
        link,
    }
}

use EntityKind::*;

pub const EDGES: &[Edge] = &[
    edge(User, Band, Link::Column("owner_id")),
    edge(User, Member, Link::Column("owner_id")),
    edge(User, Event, Link::Column("owner_id")),
    edge(User, Post, Link::Column("author_id")),
    edge(User, Comment, Link::Column("author_id")),
    edge(User, Like, Link::Column("user_id")),
    edge(User, Report, Link::Column("reporter_id")),
    edge(Band, Member, Link::Column("band_id")),
    edge(Band, Event, Link::Column("band_id")),
    edge(Post, Comment, Link::Column("post_id")),
    edge(Post, Like, Link::Column("post_id")),
    edge(Post, Report, Link::Target("post")),
    edge(Comment, Comment, Link::Column("parent_id")),
    edge(Comment, Like, Link::Column("comment_id")),
    edge(Comment, Report, Link::Target("comment")),
];

/// Edges leaving `kind`.
pub fn children_of(kind: EntityKind) -> impl Iterator<Item = &'static Edge> {
    EDGES.iter().filter(move |e| e.parent == kind)
}

/// Edges entering `kind`.
pub fn parents_of(kind: EntityKind) -> impl Iterator<Item = &'static Edge> {
    EDGES.iter().filter(move |e| e.child == kind)
}

/// A column holding media URLs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaField {
    pub kind: EntityKind,
    pub column: &'static str,
    pub bucket: Bucket,
    /// The column holds a JSON array of URLs rather than a single URL.
    pub list: bool,
}

const fn media(kind: EntityKind, column: &'static str, bucket: Bucket, list: bool) -> MediaField {
    MediaField {
        kind,
        column,
        bucket,
        list,
    }
}

pub const MEDIA_FIELDS: &[MediaField] = &[
    media(User, "avatar_url", Bucket::Avatars, false),
    media(Band, "banner_image_url", Bucket::Bands, false),
    media(Band, "profile_image_url", Bucket::Bands, false),
    media(Member, "avatar_url", Bucket::Members, false),
    media(Event, "poster_image_url", Bucket::Events, false),
    media(Post, "image_urls", Bucket::Community, true),
];

/// Media columns whose URLs resolve into `bucket`.
pub fn media_fields_in(bucket: Bucket) -> impl Iterator<Item = &'static MediaField> {
    MEDIA_FIELDS.iter().filter(move |f| f.bucket == bucket)
}

/// Media columns of `kind`.
pub fn media_fields_of(kind: EntityKind) -> impl Iterator<Item = &'static MediaField> {
    MEDIA_FIELDS.iter().filter(move |f| f.kind == kind)
}

#[derive(Debug, Clone)]
pub struct PlanNode {
    pub entity: EntityRef,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena of every row reached from a cascade root.
#[derive(Debug, Clone, Default)]
pub struct SubtreePlan {
    nodes: Vec<PlanNode>,
    index: HashMap<EntityRef, usize>,
    /// Node indices in DFS post-order.
    order: Vec<usize>,
}

impl SubtreePlan {
    pub fn root(&self) -> Option<EntityRef> {
        self.nodes.first().map(|n| n.entity)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.index.contains_key(entity)
    }

    pub fn node(&self, entity: &EntityRef) -> Option<&PlanNode> {
        self.index.get(entity).map(|&i| &self.nodes[i])
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.nodes.iter().map(|n| n.entity)
    }

    /// Ids of every planned row of `kind`.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<i32> {
        self.nodes
            .iter()
            .filter(|n| n.entity.kind == kind)
            .map(|n| n.entity.id)
            .collect()
    }

    /// Rows in deletion order: every row comes after all rows it owns.
    pub fn deletion_order(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.order.iter().map(|&i| self.nodes[i].entity)
    }

    /// Deletion order with consecutive rows of the same kind grouped together.
    pub fn batches(&self) -> Vec<(EntityKind, Vec<i32>)> {
        let mut batches: Vec<(EntityKind, Vec<i32>)> = Vec::new();
        for entity in self.deletion_order() {
            match batches.last_mut() {
                Some((kind, ids)) if *kind == entity.kind => ids.push(entity.id),
                _ => batches.push((entity.kind, vec![entity.id])),
            }
        }
        batches
    }

    pub fn counts(&self) -> BTreeMap<EntityKind, u64> {
        let mut counts = BTreeMap::new();
        for node in &self.nodes {
            *counts.entry(node.entity.kind).or_insert(0) += 1;
        }
        counts
    }

    fn push(&mut self, entity: EntityRef, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(PlanNode {
            entity,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        self.index.insert(entity, idx);
        idx
    }
}

enum Step {
    Visit {
        entity: EntityRef,
        parent: Option<usize>,
    },
    Finish(usize),
}

/// Iterative depth-first walk that builds a `SubtreePlan`.
///
/// ```ignore
/// let mut walk = SubtreeWalk::new(root);
/// while let Some(entity) = walk.next_entity() {
///     walk.expand(fetch_children(entity).await?);
/// }
/// let plan = walk.finish();
/// ```
///
/// Rows are marked visited when they are first expanded, so rows reachable
/// along several edges (a like owned by both a user and a post) or through a
/// reply cycle are planned exactly once.
pub struct SubtreeWalk {
    plan: SubtreePlan,
    stack: Vec<Step>,
    current: Option<usize>,
}

impl SubtreeWalk {
    pub fn new(root: EntityRef) -> Self {
        Self {
            plan: SubtreePlan::default(),
            stack: vec![Step::Visit {
                entity: root,
                parent: None,
            }],
            current: None,
        }
    }

    /// The next row whose children must be fetched, or `None` when done.
    pub fn next_entity(&mut self) -> Option<EntityRef> {
        self.current = None;
        while let Some(step) = self.stack.pop() {
            match step {
                Step::Finish(idx) => self.plan.order.push(idx),
                Step::Visit { entity, parent } => {
                    if self.plan.contains(&entity) {
                        continue;
                    }
                    let idx = self.plan.push(entity, parent);
                    self.stack.push(Step::Finish(idx));
                    self.current = Some(idx);
                    return Some(entity);
                }
            }
        }
        None
    }

    /// Record the children of the row last returned by `next_entity`.
    pub fn expand(&mut self, children: impl IntoIterator<Item = EntityRef>) {
        let Some(idx) = self.current.take() else {
            return;
        };
        let children: Vec<EntityRef> = children.into_iter().collect();
        for entity in children.into_iter().rev() {
            if !self.plan.contains(&entity) {
                self.stack.push(Step::Visit {
                    entity,
                    parent: Some(idx),
                });
            }
        }
    }

    pub fn finish(mut self) -> SubtreePlan {
        while self.next_entity().is_some() {}
        self.plan
    }
}
