//! `/family` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, CurrentUser},
        response::{ApiResult, Envelope},
    },
    core::family::{self, FamilyCreated},
    entities::{FamilyMemberModel, LedgerModel},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/family", post(create_family))
        .route("/family/:id/members", post(add_member))
        .route("/family/ledgers", get(ledgers))
}

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
}

async fn create_family(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(body): ApiJson<CreateFamilyRequest>,
) -> ApiResult<FamilyCreated> {
    let created = family::create_family(&state.db, user_id, &body.name, Utc::now()).await?;
    Ok(Envelope::ok(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: i64,
}

async fn add_member(
    State(state): State<AppState>,
    CurrentUser(actor_id): CurrentUser,
    Path(family_id): Path<i64>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> ApiResult<FamilyMemberModel> {
    let member =
        family::add_member(&state.db, actor_id, family_id, body.user_id, Utc::now()).await?;
    Ok(Envelope::ok(member))
}

async fn ledgers(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Vec<LedgerModel>> {
    Ok(Envelope::ok(family::ledgers_for_user(&state.db, user_id).await?))
}
