//! Reminder entity - Bill, audit and custom reminders.
//!
//! Scheduling details live in `config`, a serialized JSON blob decoded by
//! [`crate::core::reminder::ReminderConfig`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the reminder is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    /// Pay a bill
    #[sea_orm(string_value = "BILL")]
    Bill,
    /// Review transaction categorization
    #[sea_orm(string_value = "AUDIT")]
    Audit,
    /// Anything else
    #[sea_orm(string_value = "CUSTOM")]
    Custom,
}

/// Server-side reminder status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    /// Waiting for `due_at`
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Completed for the current period
    #[sea_orm(string_value = "DONE")]
    Done,
    /// Deferred until `due_at`
    #[sea_orm(string_value = "SNOOZE")]
    Snooze,
}

/// Reminder database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reminders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner
    pub user_id: i64,
    /// Bill, audit or custom
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    /// Current status
    pub status: ReminderStatus,
    /// Serialized `ReminderConfig`
    pub config: String,
    /// When the reminder was created
    pub created_at: DateTimeUtc,
    /// Last status or schedule change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Reminder and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
