//! `/reminders` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, CurrentUser},
        response::{ApiResult, Envelope},
    },
    core::reminder::{self, ReminderConfig, ReminderView},
    entities::reminder::ReminderType,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list).post(create))
        .route("/reminders/:id/done", post(done))
        .route("/reminders/:id/snooze", post(snooze))
}

async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Vec<ReminderView>> {
    Ok(Envelope::ok(
        reminder::list_reminders(&state.db, user_id, Utc::now()).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    pub config: ReminderConfig,
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(body): ApiJson<CreateReminderRequest>,
) -> ApiResult<ReminderView> {
    let view = reminder::create_reminder(
        &state.db,
        user_id,
        body.reminder_type,
        body.config,
        Utc::now(),
    )
    .await?;
    Ok(Envelope::ok(view))
}

async fn done(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<ReminderView> {
    Ok(Envelope::ok(
        reminder::mark_done(&state.db, user_id, id, Utc::now()).await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct SnoozeRequest {
    pub minutes: Option<i64>,
}

// The body is optional; a missing or empty body snoozes for the default duration.
async fn snooze(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    body: Option<Json<SnoozeRequest>>,
) -> ApiResult<ReminderView> {
    let minutes = body.and_then(|Json(b)| b.minutes);
    Ok(Envelope::ok(
        reminder::snooze(&state.db, user_id, id, minutes, Utc::now()).await?,
    ))
}
