use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    pub venue: Option<String>,

    #[sea_orm(indexed)]
    pub band_id: Option<i32>,

    #[sea_orm(indexed)]
    pub owner_id: Option<i32>,

    pub poster_image_url: Option<String>,

    /// Soft-deleted events keep their row but no longer protect their poster.
    #[sea_orm(default_value = false, indexed)]
    pub is_deleted: bool,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
