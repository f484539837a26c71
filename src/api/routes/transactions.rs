//! `/transactions` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, CurrentUser},
        response::{ApiError, ApiResult, Envelope},
    },
    core::transaction::{
        self, NewTransaction, Page, TransactionFilter, TransactionOutcome, TransactionPatch,
    },
    entities::{TransactionModel, transaction::TransactionType},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u64 = 20;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/:id", patch(update_transaction))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub amount: i64,
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub ledger_id: Option<i64>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

fn parse_type(raw: Option<&str>) -> Result<Option<TransactionType>, ApiError> {
    raw.map(|value| {
        TransactionType::parse(value).ok_or_else(|| {
            ApiError::bad_request(format!("type must be EXPENSE or INCOME, got '{value}'"))
        })
    })
    .transpose()
}

async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(body): ApiJson<CreateTransactionRequest>,
) -> ApiResult<TransactionOutcome> {
    let new = NewTransaction {
        amount: body.amount,
        transaction_type: parse_type(body.kind.as_deref())?.unwrap_or(TransactionType::Expense),
        category: body.category,
        note: body.note,
        merchant: body.merchant,
        ledger_id: body.ledger_id,
        occurred_at: body.occurred_at,
    };
    let outcome = transaction::create_transaction(&state.db, user_id, new, Utc::now()).await?;
    Ok(Envelope::ok(outcome))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub ledger_id: Option<i64>,
}

async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Page<TransactionModel>> {
    let filter = TransactionFilter {
        page: query.page.unwrap_or(1),
        size: query.size.unwrap_or(DEFAULT_PAGE_SIZE),
        from: query.from,
        to: query.to,
        category: query.category.filter(|c| !c.trim().is_empty()),
        ledger_id: query.ledger_id,
    };
    let page = transaction::list_transactions(&state.db, user_id, filter).await?;
    Ok(Envelope::ok(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchTransactionRequest {
    pub amount: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub merchant: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<PatchTransactionRequest>,
) -> ApiResult<TransactionModel> {
    let patch = TransactionPatch {
        amount: body.amount,
        transaction_type: parse_type(body.kind.as_deref())?,
        category: body.category,
        note: body.note,
        merchant: body.merchant,
        occurred_at: body.occurred_at,
    };
    let updated = transaction::update_transaction(&state.db, user_id, id, patch).await?;
    Ok(Envelope::ok(updated))
}
