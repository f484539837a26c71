//! Incentive business logic - tasks, achievements and points.
//!
//! Two flows write to `user_tasks`:
//!
//! - **completion** ([`complete_task`]) runs as a side effect of other operations. Daily
//!   tasks complete at most once per local calendar day; the `(user_id, task_id)` unique
//!   index plus an upsert keeps concurrent completions from creating duplicate rows.
//! - **claim** ([`claim_task`]) turns a COMPLETED task into points inside one database
//!   transaction: status update, point increment and ledger append commit together.
//!
//! Side effects never fail the operation that triggered them. They report a
//! [`SideEffect`] instead so callers and tests can observe what happened.

use crate::{
    entities::{
        Achievement, PointsLedger, Task, Transaction, User, UserAchievement, UserTask, achievement,
        points_ledger, task, transaction, user, user_achievement, user_task,
        user_task::TaskStatus,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Local, Utc};
use sea_orm::{
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Task completed by recording a transaction.
pub const ADD_TRANSACTION: &str = "ADD_TRANSACTION";
/// Task completed by classifying a bill.
pub const CLASSIFY_BILL: &str = "CLASSIFY_BILL";
/// Task completed by submitting the risk questionnaire.
pub const RISK_ASSESSMENT: &str = "RISK_ASSESSMENT";
/// Achievement unlocked by the first transaction.
pub const FIRST_STEP: &str = "FIRST_STEP";
/// Achievement unlocked by creating a family.
pub const FAMILY_FIRST: &str = "FAMILY_FIRST";

/// Outcome of one best-effort side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "camelCase")]
pub enum SideEffect {
    /// The side effect changed state
    Applied,
    /// Nothing to do (already done today, definition missing, ...)
    Skipped,
    /// The side effect failed; the primary operation still succeeded
    Failed(String),
}

impl SideEffect {
    fn from_result(label: &str, result: Result<bool>) -> Self {
        match result {
            Ok(true) => Self::Applied,
            Ok(false) => Self::Skipped,
            Err(e) => {
                warn!("{label} side effect failed: {e}");
                Self::Failed(e.to_string())
            }
        }
    }
}

/// Side effects of creating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSideEffects {
    /// Completion of the `ADD_TRANSACTION` daily task
    pub daily_task: SideEffect,
    /// Unlock of the `FIRST_STEP` achievement
    pub first_step: SideEffect,
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    /// Task that was claimed
    pub task_code: String,
    /// Points granted by this claim
    pub points_awarded: i64,
    /// User balance after the claim
    pub total_points: i64,
}

/// A task as seen by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    /// Task code
    pub code: String,
    /// Display title
    pub title: String,
    /// Points on claim
    pub points: i64,
    /// Progress target
    pub target: i32,
    /// Resets daily
    pub daily: bool,
    /// Status for display; a daily task claimed on an earlier day shows as PENDING
    pub status: TaskStatus,
    /// Progress towards `target`
    pub progress: i32,
    /// Completed since local midnight
    pub completed_today: bool,
    /// Last completion time
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// Points, achievements and recent grants for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveSummary {
    /// Current balance
    pub points: i64,
    /// Unlocked achievements
    pub achievements: Vec<achievement::Model>,
    /// Most recent point grants, newest first
    pub recent_points: Vec<points_ledger::Model>,
}

/// Start of the local calendar day containing `now`, in UTC.
#[must_use]
pub fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map_or(now, |midnight| midnight.with_timezone(&Utc))
}

fn completed_since(last: Option<DateTime<Utc>>, boundary: DateTime<Utc>) -> bool {
    last.is_some_and(|at| at >= boundary)
}

async fn find_task<C: ConnectionTrait>(db: &C, code: &str) -> Result<Option<task::Model>> {
    Task::find()
        .filter(task::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_user_task<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    task_id: i64,
) -> Result<Option<user_task::Model>> {
    UserTask::find()
        .filter(user_task::Column::UserId.eq(user_id))
        .filter(user_task::Column::TaskId.eq(task_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks `code` COMPLETED for the user if it is due.
///
/// Daily tasks are due when they were never completed or last completed before local
/// midnight; other tasks are due only if never completed. Returns `Ok(true)` when the
/// row transitioned, `Ok(false)` when there was nothing to do (including an unknown code).
pub async fn complete_task<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(task) = find_task(db, code).await? else {
        return Ok(false);
    };

    let existing = find_user_task(db, user_id, task.id).await?;
    let last_completed = existing.as_ref().and_then(|ut| ut.last_completed_at);
    let already_done = if task.daily {
        completed_since(last_completed, local_midnight(now))
    } else {
        last_completed.is_some()
    };
    if already_done {
        return Ok(false);
    }

    let row = user_task::ActiveModel {
        user_id: Set(user_id),
        task_id: Set(task.id),
        status: Set(TaskStatus::Completed),
        progress: Set(1),
        last_completed_at: Set(Some(now)),
        claimed_at: Set(None),
        ..Default::default()
    };
    UserTask::insert(row)
        .on_conflict(
            OnConflict::columns([user_task::Column::UserId, user_task::Column::TaskId])
                .update_columns([
                    user_task::Column::Status,
                    user_task::Column::Progress,
                    user_task::Column::LastCompletedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!(user_id, task = code, "task completed");
    Ok(true)
}

/// Unlocks achievement `code` for the user.
///
/// Returns `Ok(false)` for unknown codes and for achievements the user already has
/// (the unique-constraint violation is swallowed).
pub async fn unlock_achievement<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(definition) = Achievement::find()
        .filter(achievement::Column::Code.eq(code))
        .one(db)
        .await?
    else {
        return Ok(false);
    };

    let unlock = user_achievement::ActiveModel {
        user_id: Set(user_id),
        achievement_id: Set(definition.id),
        unlocked_at: Set(now),
        ..Default::default()
    };

    match unlock.insert(db).await {
        Ok(_) => {
            info!(user_id, achievement = code, "achievement unlocked");
            Ok(true)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Gamification hook run after a transaction row is committed.
pub async fn on_transaction_created(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> TransactionSideEffects {
    let daily_task = SideEffect::from_result(
        ADD_TRANSACTION,
        complete_task(db, user_id, ADD_TRANSACTION, now).await,
    );

    let first_step = async {
        let count = Transaction::find()
            .filter(transaction::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        if count == 1 {
            unlock_achievement(db, user_id, FIRST_STEP, now).await
        } else {
            Ok(false)
        }
    }
    .await;

    TransactionSideEffects {
        daily_task,
        first_step: SideEffect::from_result(FIRST_STEP, first_step),
    }
}

/// Best-effort task completion for operations other than transaction creation.
pub async fn complete_task_best_effort(
    db: &DatabaseConnection,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> SideEffect {
    SideEffect::from_result(code, complete_task(db, user_id, code, now).await)
}

/// Best-effort achievement unlock.
pub async fn unlock_achievement_best_effort(
    db: &DatabaseConnection,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> SideEffect {
    SideEffect::from_result(code, unlock_achievement(db, user_id, code, now).await)
}

/// Moves a user task from COMPLETED to CLAIMED. Returns `false` if it was no longer
/// COMPLETED when the update ran.
async fn mark_claimed<C: ConnectionTrait>(
    db: &C,
    user_task_id: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = UserTask::update_many()
        .col_expr(user_task::Column::Status, Expr::value(TaskStatus::Claimed))
        .col_expr(user_task::Column::ClaimedAt, Expr::value(Some(now)))
        .filter(user_task::Column::Id.eq(user_task_id))
        .filter(user_task::Column::Status.eq(TaskStatus::Completed))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Claims the reward for a COMPLETED task.
///
/// # Errors
/// * [`Error::NotFound`] if no task has this code
/// * [`Error::TaskNotClaimable`] if the user's task is missing or not COMPLETED
pub async fn claim_task(
    db: &DatabaseConnection,
    user_id: i64,
    code: &str,
    now: DateTime<Utc>,
) -> Result<ClaimReceipt> {
    let txn = db.begin().await?;

    let task = find_task(&txn, code)
        .await?
        .ok_or_else(|| Error::not_found("Task", code))?;

    let user_task = find_user_task(&txn, user_id, task.id).await?;
    let user_task = match user_task {
        Some(ut) if ut.status == TaskStatus::Completed => ut,
        other => {
            return Err(Error::TaskNotClaimable {
                code: code.to_string(),
                status: other.map_or_else(|| "MISSING".to_string(), |ut| ut.status.to_string()),
            });
        }
    };

    // A concurrent claim may have flipped the row since it was read
    if !mark_claimed(&txn, user_task.id, now).await? {
        return Err(Error::TaskNotClaimable {
            code: code.to_string(),
            status: TaskStatus::Claimed.to_string(),
        });
    }

    let updated = User::update_many()
        .col_expr(
            user::Column::Points,
            Expr::col(user::Column::Points).add(task.points),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(&txn)
        .await?;
    if updated.rows_affected == 0 {
        return Err(Error::not_found("User", user_id));
    }

    points_ledger::ActiveModel {
        user_id: Set(user_id),
        delta: Set(task.points),
        reason: Set(format!("CLAIM:{code}")),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let total_points = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .map_or(0, |u| u.points);

    txn.commit().await?;
    info!(user_id, task = code, points = task.points, "task claimed");

    Ok(ClaimReceipt {
        task_code: code.to_string(),
        points_awarded: task.points,
        total_points,
    })
}

/// Lists every task with the user's progress.
pub async fn list_tasks(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<TaskProgress>> {
    let tasks = Task::find().order_by_asc(task::Column::Id).all(db).await?;
    let progress: HashMap<i64, user_task::Model> = UserTask::find()
        .filter(user_task::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|ut| (ut.task_id, ut))
        .collect();
    let midnight = local_midnight(now);

    Ok(tasks
        .into_iter()
        .map(|task| {
            let row = progress.get(&task.id);
            let last_completed_at = row.and_then(|ut| ut.last_completed_at);
            let completed_today = completed_since(last_completed_at, midnight);
            let mut status = row.map_or(TaskStatus::Pending, |ut| ut.status);
            if task.daily && !completed_today && status == TaskStatus::Claimed {
                status = TaskStatus::Pending;
            }
            TaskProgress {
                code: task.code,
                title: task.title,
                points: task.points,
                target: task.target,
                daily: task.daily,
                status,
                progress: row.map_or(0, |ut| ut.progress),
                completed_today,
                last_completed_at,
            }
        })
        .collect())
}

/// Points balance, unlocked achievements and the last 20 point grants.
pub async fn summary(db: &DatabaseConnection, user_id: i64) -> Result<IncentiveSummary> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;

    let achievements = UserAchievement::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .order_by_asc(user_achievement::Column::UnlockedAt)
        .find_also_related(Achievement)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(_, definition)| definition)
        .collect();

    let recent_points = PointsLedger::find()
        .filter(points_ledger::Column::UserId.eq(user_id))
        .order_by_desc(points_ledger::Column::CreatedAt)
        .order_by_desc(points_ledger::Column::Id)
        .limit(20)
        .all(db)
        .await?;

    Ok(IncentiveSummary {
        points: user.points,
        achievements,
        recent_points,
    })
}
