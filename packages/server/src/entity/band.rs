use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "band")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub genre: Option<String>,

    /// Owning user. Not a foreign key: legacy rows may point at deleted users.
    #[sea_orm(indexed)]
    pub owner_id: Option<i32>,

    pub banner_image_url: Option<String>,

    pub profile_image_url: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
