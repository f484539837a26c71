//! Audit log entity - Client-side call records shipped in batches.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// HTTP method of the audited call
    pub method: String,
    /// Request path
    pub path: String,
    /// Response status, absent for network errors and timeouts
    pub status: Option<i32>,
    /// Wall-clock latency
    pub latency_ms: i64,
    /// Error message, if the call failed
    pub error: Option<String>,
    /// When the server stored the entry
    pub recorded_at: DateTimeUtc,
}

/// `AuditLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
