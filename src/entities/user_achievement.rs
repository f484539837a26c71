//! User achievement entity - Records that a user unlocked an achievement.
//!
//! `(user_id, achievement_id)` is unique so a second unlock fails with a
//! constraint violation, which callers ignore.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User achievement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_achievements")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who unlocked it
    pub user_id: i64,
    /// Achievement unlocked
    pub achievement_id: i64,
    /// When it was unlocked
    pub unlocked_at: DateTimeUtc,
}

/// Defines relationships between `UserAchievement` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The achievement definition
    #[sea_orm(
        belongs_to = "super::achievement::Entity",
        from = "Column::AchievementId",
        to = "super::achievement::Column::Id"
    )]
    Achievement,
    /// The user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Achievement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
