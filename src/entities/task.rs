//! Task entity - Static definition of an incentive task.
//!
//! Tasks are seeded from the `[[tasks]]` section of `config.toml`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Task database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the task
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable code used by triggers and the claim endpoint (e.g. `ADD_TRANSACTION`)
    #[sea_orm(unique)]
    pub code: String,
    /// Display title
    pub title: String,
    /// Points granted on claim
    pub points: i64,
    /// Progress needed to complete
    pub target: i32,
    /// Whether the task resets every calendar day
    pub daily: bool,
}

/// Defines relationships between Task and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One task has per-user progress rows
    #[sea_orm(has_many = "super::user_task::Entity")]
    UserTasks,
}

impl Related<super::user_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserTasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
