//! Product entity - Financial products offered as recommendations.
//!
//! Products are seeded from the `[[products]]` section of `config.toml`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable catalog code
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Risk level 1 (lowest) to 5 (highest)
    pub risk_level: i32,
    /// Expected annual return as a fraction (0.035 = 3.5%)
    pub expected_return: f64,
    /// Minimum purchase in minor units
    pub min_amount: i64,
    /// Short description
    pub description: String,
}

/// `Product` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
