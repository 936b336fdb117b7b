use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation state of a report.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl ReportStatus {
    /// Statuses after which a report is only kept for the retention window.
    pub const TERMINAL: &'static [ReportStatus] = &[Self::Resolved, Self::Dismissed];
}

/// Polymorphic report target: `target_type` names the table `target_id` points into.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub reporter_id: Option<i32>,

    /// `post` or `comment`.
    #[sea_orm(indexed)]
    pub target_type: String,

    #[sea_orm(indexed)]
    pub target_id: i32,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    #[sea_orm(indexed)]
    pub status: ReportStatus,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
