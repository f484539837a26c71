//! Points ledger entity - Append-only log of incentive point grants.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Points ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "points_ledger")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance changed
    pub user_id: i64,
    /// Points added (negative for spending)
    pub delta: i64,
    /// Why, e.g. `CLAIM:ADD_TRANSACTION`
    pub reason: String,
    /// When the grant happened
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `PointsLedger` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
