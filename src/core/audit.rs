//! Audit log ingest for batches shipped by [`crate::client::AuditQueue`].

use crate::{
    entities::{AuditLog, audit_log},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest batch accepted in one request.
pub const MAX_BATCH: usize = 500;

/// One client-side HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Response status, absent on network errors and timeouts
    #[serde(default)]
    pub status: Option<u16>,
    /// Wall-clock latency including retries
    pub latency_ms: u64,
    /// Error kind or message
    #[serde(default)]
    pub error: Option<String>,
}

/// Stores a batch; returns the number of rows written.
///
/// # Errors
/// * [`Error::Validation`] if the batch exceeds [`MAX_BATCH`]
pub async fn ingest(
    db: &DatabaseConnection,
    entries: Vec<AuditEntry>,
    now: DateTime<Utc>,
) -> Result<usize> {
    if entries.len() > MAX_BATCH {
        return Err(Error::validation(format!(
            "audit batch of {} exceeds the limit of {MAX_BATCH}",
            entries.len()
        )));
    }
    if entries.is_empty() {
        return Ok(0);
    }

    let count = entries.len();
    let rows = entries
        .into_iter()
        .map(|entry| {
            Ok(audit_log::ActiveModel {
                method: Set(entry.method),
                path: Set(entry.path),
                status: Set(entry.status.map(i32::from)),
                latency_ms: Set(i64::try_from(entry.latency_ms).map_err(|_| {
                    Error::validation(format!("latencyMs {} is out of range", entry.latency_ms))
                })?),
                error: Set(entry.error),
                recorded_at: Set(now),
                ..Default::default()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    AuditLog::insert_many(rows).exec_without_returning(db).await?;
    debug!(count, "audit batch stored");
    Ok(count)
}
