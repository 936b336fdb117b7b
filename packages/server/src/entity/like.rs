use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A like on either a post or a comment.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "like")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: Option<i32>,

    #[sea_orm(indexed)]
    pub post_id: Option<i32>,

    #[sea_orm(indexed)]
    pub comment_id: Option<i32>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
