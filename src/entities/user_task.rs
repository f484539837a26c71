//! User task entity - Per-user progress on a [`super::task`] definition.
//!
//! Status moves PENDING → COMPLETED → CLAIMED. `(user_id, task_id)` is unique,
//! which is what makes the daily completion upsert idempotent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a user's task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not yet done
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Done, reward not yet collected
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Reward collected
    #[sea_orm(string_value = "CLAIMED")]
    Claimed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Claimed => "CLAIMED",
        };
        f.write_str(label)
    }
}

/// User task database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_tasks")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User making progress
    pub user_id: i64,
    /// Task definition
    pub task_id: i64,
    /// Current status
    pub status: TaskStatus,
    /// Progress towards `task.target`
    pub progress: i32,
    /// Last time the task moved to COMPLETED
    pub last_completed_at: Option<DateTimeUtc>,
    /// Last time the reward was claimed
    pub claimed_at: Option<DateTimeUtc>,
}

/// Defines relationships between `UserTask` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each progress row belongs to one task
    #[sea_orm(
        belongs_to = "super::task::Entity",
        from = "Column::TaskId",
        to = "super::task::Column::Id"
    )]
    Task,
    /// Each progress row belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
