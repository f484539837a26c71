//! `/risk` and `/products` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, CurrentUser},
        response::{ApiResult, Envelope},
    },
    core::{
        product::{self, Recommendations},
        risk::{self, AssessmentResult, AssessmentStarted},
    },
};
use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/risk/assessment/start", post(start))
        .route("/risk/assessment/submit", post(submit))
        .route("/products/recommendations", get(recommendations))
}

async fn start(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<AssessmentStarted> {
    Ok(Envelope::ok(
        risk::start_assessment(&state.db, user_id, Utc::now()).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub assessment_id: i64,
    pub answers: BTreeMap<String, String>,
}

async fn submit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(body): ApiJson<SubmitRequest>,
) -> ApiResult<AssessmentResult> {
    let result = risk::submit_assessment(
        &state.db,
        user_id,
        body.assessment_id,
        body.answers,
        Utc::now(),
    )
    .await?;
    Ok(Envelope::ok(result))
}

async fn recommendations(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Recommendations> {
    Ok(Envelope::ok(product::recommend(&state.db, user_id).await?))
}
