//! Family entity - A group of users sharing one or more ledgers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Family database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "families")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the family
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Family name
    pub name: String,
    /// User who created the family
    pub owner_id: i64,
    /// When the family was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Family and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owner of the family
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One family has many members
    #[sea_orm(has_many = "super::family_member::Entity")]
    Members,
    /// One family has many shared ledgers
    #[sea_orm(has_many = "super::ledger::Entity")]
    Ledgers,
}

impl Related<super::family_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
