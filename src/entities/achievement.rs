//! Achievement entity - One-time badges such as `FIRST_STEP`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Achievement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "achievements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code (e.g. `FIRST_STEP`)
    #[sea_orm(unique)]
    pub code: String,
    /// Display title
    pub title: String,
    /// What the user did to earn it
    pub description: String,
}

/// Defines relationships between Achievement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Unlocks of this achievement
    #[sea_orm(has_many = "super::user_achievement::Entity")]
    UserAchievements,
}

impl Related<super::user_achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAchievements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
