//! Shared test utilities for Ledgerly.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::catalog::{parse_catalog, seed_demo_user},
    core::transaction::{self, NewTransaction, TransactionOutcome},
    entities::{transaction::TransactionType, user},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

pub use crate::config::catalog::DEMO_USER_ID as DEMO_USER;

/// Catalog seeded into every test database.
pub const TEST_CATALOG: &str = r#"
    [[tasks]]
    code = "ADD_TRANSACTION"
    title = "Record a transaction"
    points = 10
    daily = true

    [[tasks]]
    code = "CLASSIFY_BILL"
    title = "Scan a bill"
    points = 15
    daily = true

    [[tasks]]
    code = "RISK_ASSESSMENT"
    title = "Complete the risk questionnaire"
    points = 50

    [[achievements]]
    code = "FIRST_STEP"
    title = "First step"
    description = "Recorded your first transaction"

    [[achievements]]
    code = "FAMILY_FIRST"
    title = "Family first"
    description = "Created a family ledger"

    [[products]]
    code = "MMF"
    name = "Money market fund"
    risk_level = 1
    expected_return = 0.02

    [[products]]
    code = "BOND"
    name = "Bond fund"
    risk_level = 2
    expected_return = 0.035

    [[products]]
    code = "EQUITY"
    name = "Equity fund"
    risk_level = 4
    expected_return = 0.08
"#;

/// Creates an in-memory `SQLite` database with all tables initialized,
/// the demo user and the test catalog.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    seed_demo_user(&db).await?;
    parse_catalog(TEST_CATALOG)?.seed(&db).await?;
    Ok(db)
}

/// Creates another user with zero points.
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<user::Model> {
    let model = user::ActiveModel {
        name: Set(name.to_string()),
        points: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// A valid expense with sensible defaults.
///
/// # Defaults
/// * `transaction_type`: EXPENSE
/// * `ledger_id`: None (personal)
/// * `occurred_at`: now
#[must_use]
pub fn expense(amount: i64, category: &str) -> NewTransaction {
    NewTransaction {
        amount,
        transaction_type: TransactionType::Expense,
        category: category.to_string(),
        note: None,
        merchant: None,
        ledger_id: None,
        occurred_at: None,
    }
}

/// Records an expense for `user_id` now.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    user_id: i64,
    amount: i64,
    category: &str,
) -> Result<TransactionOutcome> {
    transaction::create_transaction(db, user_id, expense(amount, category), chrono::Utc::now())
        .await
}
