//! `/ai/chat`, `/audit/logs` and `/health` handlers.

use crate::{
    ai::ChatMessage,
    api::{
        AppState,
        extract::ApiJson,
        response::{ApiResult, Envelope},
    },
    core::{
        audit::{self, AuditEntry},
        chat::{self, ChatReply},
    },
};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ai/chat", post(ai_chat))
        .route("/audit/logs", post(audit_logs))
        .route("/health", get(health))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

async fn ai_chat(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> ApiResult<ChatReply> {
    let reply = chat::reply(state.chat.as_deref(), &body.message, &body.history).await?;
    Ok(Envelope::ok(reply))
}

#[derive(Debug, Deserialize)]
pub struct AuditBatch {
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Serialize)]
pub struct AuditStored {
    pub stored: usize,
}

async fn audit_logs(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AuditBatch>,
) -> ApiResult<AuditStored> {
    let stored = audit::ingest(&state.db, body.entries, Utc::now()).await?;
    Ok(Envelope::ok(AuditStored { stored }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
    pub ai: bool,
}

async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    let database = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Database ping failed: {e}");
            false
        }
    };
    Ok(Envelope::ok(Health {
        status: if database { "ok" } else { "degraded" },
        database,
        ai: state.chat.is_some(),
    }))
}
