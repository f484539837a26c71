//! Ledger entity - A book that transactions can be filed under.
//!
//! Personal ledgers have no `family_id`; family ledgers are shared with every
//! member of the family.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledgers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the ledger
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ledger name
    pub name: String,
    /// User who created the ledger
    pub owner_id: i64,
    /// Family the ledger is shared with, if any
    pub family_id: Option<i64>,
    /// When the ledger was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Ledger and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Family the ledger is shared with
    #[sea_orm(
        belongs_to = "super::family::Entity",
        from = "Column::FamilyId",
        to = "super::family::Column::Id"
    )]
    Family,
    /// One ledger has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Family.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
