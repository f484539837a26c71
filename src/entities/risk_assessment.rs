//! Risk assessment entity - A questionnaire run and its score.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the questionnaire has been answered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    /// Started, waiting for answers
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    /// Answers scored
    #[sea_orm(string_value = "SUBMITTED")]
    Submitted,
}

/// Risk assessment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "risk_assessments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User being assessed
    pub user_id: i64,
    /// In progress or submitted
    pub status: AssessmentStatus,
    /// Serialized answers, set on submit
    pub answers: Option<String>,
    /// Total score, set on submit
    pub score: Option<i32>,
    /// Risk level 1..=5, set on submit
    pub level: Option<i32>,
    /// When the assessment was started
    pub created_at: DateTimeUtc,
    /// When the answers were submitted
    pub submitted_at: Option<DateTimeUtc>,
}

/// Defines relationships between `RiskAssessment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The assessed user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
