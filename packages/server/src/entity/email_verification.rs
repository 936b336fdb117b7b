use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Short-lived verification code sent by email.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_verification")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub email: String,

    pub code: String,

    /// e.g. `register`, `reset_password`.
    pub verification_type: String,

    #[sea_orm(default_value = false)]
    pub is_used: bool,

    #[sea_orm(indexed)]
    pub expires_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
