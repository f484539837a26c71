//! Database configuration module for Ledgerly.
//!
//! This module handles the `SQLite`/`Postgres` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite unique indexes that the entity
//! macros cannot express are created explicitly afterwards.

use crate::entities::{
    Achievement, AuditLog, Family, FamilyMember, Ledger, PointsLedger, Product, Reminder,
    RiskAssessment, Task, Transaction, User, UserAchievement, UserTask, family_member,
    user_achievement, user_task,
};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityName,
    EntityTrait, Schema,
    sea_query::Index,
};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/ledgerly.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Returns the on-disk path of a `SQLite` URL, or `None` for in-memory and non-SQLite URLs.
#[must_use]
pub fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(path)
    }
}

/// Connects to the database at `database_url`.
///
/// For file-backed `SQLite` databases the parent directory is created first and the
/// connection is switched to WAL journaling.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let file_path = sqlite_file_path(database_url);
    if let Some(parent) = file_path.and_then(|p| Path::new(p).parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;

    if db.get_database_backend() == DbBackend::Sqlite && file_path.is_some() {
        db.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        info!("SQLite journal mode set to WAL");
    }

    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    debug!("Ensured table {}", entity.table_name());
    Ok(())
}

/// Creates all tables (if missing) plus the composite unique indexes.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    // Parents before children so foreign keys resolve
    create_table(db, User).await?;
    create_table(db, Family).await?;
    create_table(db, FamilyMember).await?;
    create_table(db, Ledger).await?;
    create_table(db, Transaction).await?;
    create_table(db, Task).await?;
    create_table(db, UserTask).await?;
    create_table(db, Achievement).await?;
    create_table(db, UserAchievement).await?;
    create_table(db, PointsLedger).await?;
    create_table(db, Reminder).await?;
    create_table(db, RiskAssessment).await?;
    create_table(db, Product).await?;
    create_table(db, AuditLog).await?;

    let builder = db.get_database_backend();
    let indexes = [
        Index::create()
            .name("idx_user_tasks_user_task")
            .table(UserTask)
            .col(user_task::Column::UserId)
            .col(user_task::Column::TaskId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_user_achievements_user_achievement")
            .table(UserAchievement)
            .col(user_achievement::Column::UserId)
            .col(user_achievement::Column::AchievementId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_family_members_family_user")
            .table(FamilyMember)
            .col(family_member::Column::FamilyId)
            .col(family_member::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        reminder::Model as ReminderModel, transaction::Model as TransactionModel,
        user_task::Model as UserTaskModel,
    };
    use sea_orm::QuerySelect;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://data/ledgerly.sqlite?mode=rwc"),
            Some("data/ledgerly.sqlite")
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/ledgerly"), None);
    }

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<UserTaskModel> = UserTask::find().limit(1).all(&db).await?;
        let _: Vec<ReminderModel> = Reminder::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
