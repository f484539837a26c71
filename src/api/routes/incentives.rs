//! `/incentives` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, CurrentUser},
        response::{ApiResult, Envelope},
    },
    core::incentive::{self, ClaimReceipt, IncentiveSummary, TaskProgress},
};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/incentives/claim", post(claim))
        .route("/incentives/tasks", get(tasks))
        .route("/incentives/summary", get(summary))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub task_code: String,
}

async fn claim(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(body): ApiJson<ClaimRequest>,
) -> ApiResult<ClaimReceipt> {
    let receipt =
        incentive::claim_task(&state.db, user_id, body.task_code.trim(), Utc::now()).await?;
    Ok(Envelope::ok(receipt))
}

async fn tasks(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Vec<TaskProgress>> {
    Ok(Envelope::ok(
        incentive::list_tasks(&state.db, user_id, Utc::now()).await?,
    ))
}

async fn summary(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<IncentiveSummary> {
    Ok(Envelope::ok(incentive::summary(&state.db, user_id).await?))
}
