//! Transaction entity - Represents every income or expense record.
//!
//! Amounts are stored in minor currency units (cents). `transaction_type` is
//! stored uppercase; the API accepts either case on input.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of money flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money spent
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    /// Money received
    #[sea_orm(string_value = "INCOME")]
    Income,
}

impl TransactionType {
    /// Parses `"expense"`/`"INCOME"`/... case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EXPENSE" => Some(Self::Expense),
            "INCOME" => Some(Self::Income),
            _ => None,
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Optional ledger (personal or family) the record is filed under
    pub ledger_id: Option<i64>,
    /// Amount in minor units, always positive; direction comes from `transaction_type`
    pub amount: i64,
    /// Expense or income
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Free-text category or category code (e.g. "餐饮")
    pub category: String,
    /// Optional note
    pub note: Option<String>,
    /// Merchant, usually filled from OCR quick entry
    pub merchant: Option<String>,
    /// When the spending actually happened
    pub occurred_at: DateTimeUtc,
    /// When the row was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// A transaction may be filed under a ledger
    #[sea_orm(
        belongs_to = "super::ledger::Entity",
        from = "Column::LedgerId",
        to = "super::ledger::Column::Id"
    )]
    Ledger,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledger.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
