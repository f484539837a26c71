//! Transaction business logic - Handles recording, listing and editing transactions.
//!
//! Creating a transaction commits the row first and then runs the incentive hook
//! ([`crate::core::incentive::on_transaction_created`]). The hook's outcome travels
//! back to the caller in [`TransactionOutcome`]; its failures never undo the insert.

use crate::{
    core::{family, incentive},
    entities::{Transaction, transaction, transaction::TransactionType},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;

/// Largest page size the list endpoint will serve.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Input for [`create_transaction`].
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Minor units, must be positive
    pub amount: i64,
    /// Expense or income
    pub transaction_type: TransactionType,
    /// Non-empty category
    pub category: String,
    /// Optional note
    pub note: Option<String>,
    /// Optional merchant
    pub merchant: Option<String>,
    /// Ledger to file under; the user must be able to access it
    pub ledger_id: Option<i64>,
    /// Defaults to the creation time
    pub occurred_at: Option<DateTime<Utc>>,
}

/// The created row plus what the incentive hook did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    /// The stored transaction
    #[serde(flatten)]
    pub transaction: transaction::Model,
    /// Incentive side effects
    pub side_effects: incentive::TransactionSideEffects,
}

/// Filters for [`list_transactions`]. `page` is 1-based.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Page number, 1-based; 0 is treated as 1
    pub page: u64,
    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub size: u64,
    /// Inclusive lower bound on `occurred_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `occurred_at`
    pub to: Option<DateTime<Utc>>,
    /// Exact category match
    pub category: Option<String>,
    /// Restrict to one ledger
    pub ledger_id: Option<i64>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Total matching rows
    pub total: u64,
    /// Page number served
    pub page: u64,
    /// Page size served
    pub size: u64,
}

/// Partial update for [`update_transaction`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    /// New amount
    pub amount: Option<i64>,
    /// New direction
    pub transaction_type: Option<TransactionType>,
    /// New category
    pub category: Option<String>,
    /// New note
    pub note: Option<String>,
    /// New merchant
    pub merchant: Option<String>,
    /// New occurrence time
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TransactionPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.transaction_type.is_none()
            && self.category.is_none()
            && self.note.is_none()
            && self.merchant.is_none()
            && self.occurred_at.is_none()
    }
}

fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::validation(format!(
            "amount must be a positive number of minor units, got {amount}"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("category is required"));
    }
    Ok(trimmed.to_string())
}

/// Records a transaction and runs the incentive hook.
///
/// # Errors
/// * [`Error::Validation`] for a non-positive amount, a blank category or a ledger the user
///   cannot access
pub async fn create_transaction(
    db: &DatabaseConnection,
    user_id: i64,
    new: NewTransaction,
    now: DateTime<Utc>,
) -> Result<TransactionOutcome> {
    validate_amount(new.amount)?;
    let category = validate_category(&new.category)?;

    if let Some(ledger_id) = new.ledger_id {
        if !family::can_access_ledger(db, user_id, ledger_id).await? {
            return Err(Error::validation(format!(
                "ledger {ledger_id} is not accessible"
            )));
        }
    }

    let model = transaction::ActiveModel {
        user_id: Set(user_id),
        ledger_id: Set(new.ledger_id),
        amount: Set(new.amount),
        transaction_type: Set(new.transaction_type),
        category: Set(category),
        note: Set(new.note),
        merchant: Set(new.merchant),
        occurred_at: Set(new.occurred_at.unwrap_or(now)),
        created_at: Set(now),
        ..Default::default()
    };
    let transaction = model.insert(db).await?;

    let side_effects = incentive::on_transaction_created(db, user_id, now).await;

    Ok(TransactionOutcome {
        transaction,
        side_effects,
    })
}

/// Lists transactions newest first.
///
/// Without a ledger filter only the user's own rows are returned. With one, every row
/// on that ledger is returned, including those of other family members.
///
/// # Errors
/// Returns [`Error::Validation`] if the user cannot access the requested ledger.
pub async fn list_transactions(
    db: &DatabaseConnection,
    user_id: i64,
    filter: TransactionFilter,
) -> Result<Page<transaction::Model>> {
    let page = filter.page.max(1);
    let size = filter.size.clamp(1, MAX_PAGE_SIZE);

    let mut query = match filter.ledger_id {
        Some(ledger_id) => {
            if !family::can_access_ledger(db, user_id, ledger_id).await? {
                return Err(Error::validation(format!(
                    "ledger {ledger_id} is not accessible"
                )));
            }
            Transaction::find().filter(transaction::Column::LedgerId.eq(ledger_id))
        }
        None => Transaction::find().filter(transaction::Column::UserId.eq(user_id)),
    };
    if let Some(from) = filter.from {
        query = query.filter(transaction::Column::OccurredAt.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(transaction::Column::OccurredAt.lte(to));
    }
    if let Some(category) = filter.category {
        query = query.filter(transaction::Column::Category.eq(category));
    }

    let paginator = query
        .order_by_desc(transaction::Column::OccurredAt)
        .order_by_desc(transaction::Column::Id)
        .paginate(db, size);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        total,
        page,
        size,
    })
}

/// Applies a partial update to one of the user's transactions.
///
/// # Errors
/// * [`Error::NotFound`] if the transaction does not exist or belongs to someone else
/// * [`Error::Validation`] for an invalid amount or blank category
pub async fn update_transaction(
    db: &DatabaseConnection,
    user_id: i64,
    id: i64,
    patch: TransactionPatch,
) -> Result<transaction::Model> {
    let existing = Transaction::find_by_id(id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", id))?;
    if patch.is_empty() {
        return Ok(existing);
    }

    let mut model: transaction::ActiveModel = existing.into();
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
        model.amount = Set(amount);
    }
    if let Some(kind) = patch.transaction_type {
        model.transaction_type = Set(kind);
    }
    if let Some(category) = patch.category {
        model.category = Set(validate_category(&category)?);
    }
    if let Some(note) = patch.note {
        model.note = Set(Some(note));
    }
    if let Some(merchant) = patch.merchant {
        model.merchant = Set(Some(merchant));
    }
    if let Some(occurred_at) = patch.occurred_at {
        model.occurred_at = Set(occurred_at);
    }

    Ok(model.update(db).await?)
}
