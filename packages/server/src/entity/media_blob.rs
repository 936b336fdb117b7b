use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ownership record kept alongside each uploaded media file.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_blob")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique_key = "bucket_filename")]
    pub bucket: String,

    #[sea_orm(unique_key = "bucket_filename")]
    pub filename: String,

    /// Owner entity kind (e.g. "band", "post").
    #[sea_orm(indexed)]
    pub owner_kind: String,

    #[sea_orm(indexed)]
    pub owner_id: i32,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
