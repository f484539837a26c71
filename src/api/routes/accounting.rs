//! `/accounting` handlers - bill classification.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, CurrentUser},
        response::{ApiError, ApiResult, Envelope},
    },
    core::{
        classify::{Classified, ClassifyInput},
        incentive::{self, SideEffect},
    },
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Upload limit for bill images.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounting/classify",
            post(classify_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/accounting/classify-text", post(classify_text))
}

/// A classification plus the incentive side effect it triggered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyOutcome {
    #[serde(flatten)]
    pub classified: Classified,
    pub side_effects: ClassifySideEffects,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifySideEffects {
    /// Completion of the `CLASSIFY_BILL` daily task
    pub classify_task: SideEffect,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassifyQuery {
    pub nocache: Option<String>,
}

impl ClassifyQuery {
    fn bypass_cache(&self) -> bool {
        self.nocache
            .as_deref()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

async fn classify_images(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<ClassifyQuery>,
    mut multipart: Multipart,
) -> ApiResult<ClassifyOutcome> {
    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.file_name().is_some()
            || matches!(field.name(), Some("files" | "file"));
        if !is_file {
            continue;
        }
        let bytes = field.bytes().await?;
        if !bytes.is_empty() {
            images.push(bytes.to_vec());
        }
    }
    if images.is_empty() {
        return Err(ApiError::bad_request("no image uploaded"));
    }

    classify(&state, user_id, ClassifyInput::Images(images), query.bypass_cache()).await
}

#[derive(Debug, Deserialize)]
pub struct ClassifyTextRequest {
    pub text: String,
}

async fn classify_text(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<ClassifyQuery>,
    ApiJson(body): ApiJson<ClassifyTextRequest>,
) -> ApiResult<ClassifyOutcome> {
    if body.text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    classify(&state, user_id, ClassifyInput::Text(body.text), query.bypass_cache()).await
}

async fn classify(
    state: &AppState,
    user_id: i64,
    input: ClassifyInput,
    bypass_cache: bool,
) -> ApiResult<ClassifyOutcome> {
    let classified = state.classifier.classify(input, bypass_cache).await?;
    let classify_task = incentive::complete_task_best_effort(
        &state.db,
        user_id,
        incentive::CLASSIFY_BILL,
        Utc::now(),
    )
    .await;
    Ok(Envelope::ok(ClassifyOutcome {
        classified,
        side_effects: ClassifySideEffects { classify_task },
    }))
}
