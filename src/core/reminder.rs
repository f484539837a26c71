//! Reminder business logic - The PENDING / DONE / SNOOZE state machine.
//!
//! Two sources can decide whether a reminder is due:
//!
//! - the **server** row: due iff `status == PENDING && now >= due_at`. DONE and SNOOZE
//!   rows return to PENDING once their `due_at` passes (the next period boundary for
//!   recurring reminders, the end of the snooze for snoozed ones).
//! - a **local** heuristic ([`LocalReminder`]) kept by clients for when the server has
//!   no reminder or cannot be reached.
//!
//! [`reconcile`] picks between them: the server wins whenever it has an answer.

use crate::{
    entities::{
        Reminder, reminder,
        reminder::{ReminderStatus, ReminderType},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snooze length when the caller gives none.
pub const DEFAULT_SNOOZE_MINUTES: i64 = 120;
/// Longest snooze accepted (one week).
pub const MAX_SNOOZE_MINUTES: i64 = 7 * 24 * 60;

const DEFAULT_TIME_OF_DAY: &str = "09:00";

/// Recurrence of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every calendar day
    Daily,
    /// Every week, starting Monday
    Weekly,
    /// Every calendar month, starting on the 1st
    Monthly,
}

/// Scheduling blob stored in `reminders.config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderConfig {
    /// `None` for a one-off reminder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    /// Local trigger time, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    /// Next time the reminder becomes due
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    /// Display title
    #[serde(default)]
    pub title: String,
}

impl ReminderConfig {
    /// Parsed `time_of_day`, 09:00 when unset.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if the value is not `HH:MM`.
    pub fn trigger_time(&self) -> Result<NaiveTime> {
        let raw = self.time_of_day.as_deref().unwrap_or(DEFAULT_TIME_OF_DAY);
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| Error::validation(format!("timeOfDay must be HH:MM, got '{raw}'")))
    }
}

/// Where a [`ReminderView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderSource {
    /// A persisted reminder row
    Server,
    /// The client-side heuristic
    Local,
}

/// A reminder as presented to users, tagged with its source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderView {
    /// Row id; `None` for local reminders
    pub id: Option<i64>,
    /// Reminder kind
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    /// Current status
    pub status: ReminderStatus,
    /// Display title
    pub title: String,
    /// Recurrence
    pub frequency: Option<Frequency>,
    /// Next due time
    pub due_at: Option<DateTime<Utc>>,
    /// Whether it should be shown now
    pub due: bool,
    /// Source of truth
    pub source: ReminderSource,
}

impl ReminderView {
    /// Builds the server view of a reminder row.
    ///
    /// # Errors
    /// Returns [`Error::Json`] if the stored config is not valid JSON.
    pub fn from_model(model: &reminder::Model, now: DateTime<Utc>) -> Result<Self> {
        let config: ReminderConfig = serde_json::from_str(&model.config)?;
        Ok(Self {
            id: Some(model.id),
            reminder_type: model.reminder_type,
            status: model.status,
            due: is_due(model.status, config.due_at, now),
            title: config.title,
            frequency: config.frequency,
            due_at: config.due_at,
            source: ReminderSource::Server,
        })
    }
}

/// Server due rule.
#[must_use]
pub fn is_due(status: ReminderStatus, due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    status == ReminderStatus::Pending && due_at.is_some_and(|at| now >= at)
}

fn local_instant(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(Local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
}

fn period_start(frequency: Frequency, date: NaiveDate) -> NaiveDate {
    match frequency {
        Frequency::Daily => date,
        Frequency::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Frequency::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// Trigger time of the period containing `now`.
#[must_use]
pub fn current_trigger(
    frequency: Frequency,
    time: NaiveTime,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&Local).date_naive();
    local_instant(period_start(frequency, today), time)
}

/// Trigger time of the period after the one containing `after`.
#[must_use]
pub fn next_period_boundary(
    frequency: Frequency,
    time: NaiveTime,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let start = period_start(frequency, after.with_timezone(&Local).date_naive());
    let next = match frequency {
        Frequency::Daily => start.checked_add_signed(Duration::days(1)),
        Frequency::Weekly => start.checked_add_signed(Duration::days(7)),
        Frequency::Monthly => start.checked_add_months(Months::new(1)),
    }?;
    local_instant(next, time)
}

/// Creates a reminder in PENDING.
///
/// One-off reminders need `dueAt`. Recurring reminders without `dueAt` start at the
/// trigger time of the current period, which may already be in the past.
///
/// # Errors
/// * [`Error::Validation`] for a blank title, a bad `timeOfDay` or a one-off without `dueAt`
pub async fn create_reminder(
    db: &DatabaseConnection,
    user_id: i64,
    reminder_type: ReminderType,
    mut config: ReminderConfig,
    now: DateTime<Utc>,
) -> Result<ReminderView> {
    config.title = config.title.trim().to_string();
    if config.title.is_empty() {
        return Err(Error::validation("title is required"));
    }
    let time = config.trigger_time()?;

    if config.due_at.is_none() {
        config.due_at = match config.frequency {
            Some(frequency) => current_trigger(frequency, time, now),
            None => return Err(Error::validation("dueAt is required for one-off reminders")),
        };
    }

    let model = reminder::ActiveModel {
        user_id: Set(user_id),
        reminder_type: Set(reminder_type),
        status: Set(ReminderStatus::Pending),
        config: Set(serde_json::to_string(&config)?),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    ReminderView::from_model(&model, now)
}

/// Lists the user's reminders, returning lapsed DONE/SNOOZE rows to PENDING first.
pub async fn list_reminders(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ReminderView>> {
    let rows = Reminder::find()
        .filter(reminder::Column::UserId.eq(user_id))
        .order_by_asc(reminder::Column::Id)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let config: ReminderConfig = serde_json::from_str(&row.config)?;
        let lapsed = row.status != ReminderStatus::Pending
            && config.due_at.is_some_and(|at| now >= at);

        let row = if lapsed {
            debug!(reminder_id = row.id, "reminder period elapsed, back to pending");
            let mut active: reminder::ActiveModel = row.into();
            active.status = Set(ReminderStatus::Pending);
            active.updated_at = Set(now);
            active.update(db).await?
        } else {
            row
        };
        views.push(ReminderView::from_model(&row, now)?);
    }
    Ok(views)
}

async fn find_owned(db: &DatabaseConnection, user_id: i64, id: i64) -> Result<reminder::Model> {
    Reminder::find_by_id(id)
        .filter(reminder::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Reminder", id))
}

async fn transition(
    db: &DatabaseConnection,
    row: reminder::Model,
    status: ReminderStatus,
    config: &ReminderConfig,
    now: DateTime<Utc>,
) -> Result<ReminderView> {
    let mut active: reminder::ActiveModel = row.into();
    active.status = Set(status);
    active.config = Set(serde_json::to_string(config)?);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    ReminderView::from_model(&updated, now)
}

/// Marks a reminder DONE. Recurring reminders get the next period boundary as `dueAt`;
/// one-off reminders lose their `dueAt` and stay DONE.
pub async fn mark_done(
    db: &DatabaseConnection,
    user_id: i64,
    id: i64,
    now: DateTime<Utc>,
) -> Result<ReminderView> {
    let row = find_owned(db, user_id, id).await?;
    let mut config: ReminderConfig = serde_json::from_str(&row.config)?;

    config.due_at = match config.frequency {
        Some(frequency) => next_period_boundary(frequency, config.trigger_time()?, now),
        None => None,
    };

    transition(db, row, ReminderStatus::Done, &config, now).await
}

/// Snoozes a reminder for `minutes` (default [`DEFAULT_SNOOZE_MINUTES`]).
///
/// # Errors
/// * [`Error::Validation`] if `minutes` is outside `1..=MAX_SNOOZE_MINUTES`
pub async fn snooze(
    db: &DatabaseConnection,
    user_id: i64,
    id: i64,
    minutes: Option<i64>,
    now: DateTime<Utc>,
) -> Result<ReminderView> {
    let minutes = minutes.unwrap_or(DEFAULT_SNOOZE_MINUTES);
    if !(1..=MAX_SNOOZE_MINUTES).contains(&minutes) {
        return Err(Error::validation(format!(
            "minutes must be between 1 and {MAX_SNOOZE_MINUTES}"
        )));
    }

    let row = find_owned(db, user_id, id).await?;
    let mut config: ReminderConfig = serde_json::from_str(&row.config)?;
    config.due_at = Some(now + Duration::minutes(minutes));

    transition(db, row, ReminderStatus::Snooze, &config, now).await
}

/// Client-side reminder state used when the server has no answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalReminder {
    /// Display title
    pub title: String,
    /// Recurrence
    pub frequency: Frequency,
    /// Local hour (0-23) the reminder triggers at
    pub hour: u32,
    /// Last time the user completed it
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Last time it was shown
    pub last_shown_at: Option<DateTime<Utc>>,
    /// Re-prompt suppression window
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,
}

const fn default_snooze_minutes() -> i64 {
    DEFAULT_SNOOZE_MINUTES
}

impl LocalReminder {
    /// A reminder that has never been completed or shown.
    #[must_use]
    pub fn new(title: impl Into<String>, frequency: Frequency, hour: u32) -> Self {
        Self {
            title: title.into(),
            frequency,
            hour,
            last_completed_at: None,
            last_shown_at: None,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
        }
    }

    /// Trigger time of the period containing `now`.
    #[must_use]
    pub fn trigger(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(self.hour.min(23), 0, 0)?;
        current_trigger(self.frequency, time, now)
    }

    /// Due iff this period's trigger has passed, it was not completed since, and it was
    /// not shown within the snooze window.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(trigger) = self.trigger(now) else {
            return false;
        };
        if now < trigger {
            return false;
        }
        if self.last_completed_at.is_some_and(|at| at >= trigger) {
            return false;
        }
        self.last_shown_at
            .is_none_or(|shown| now - shown >= Duration::minutes(self.snooze_minutes))
    }

    /// Local view of this reminder.
    #[must_use]
    pub fn view(&self, reminder_type: ReminderType, now: DateTime<Utc>) -> ReminderView {
        let due = self.is_due(now);
        ReminderView {
            id: None,
            reminder_type,
            status: ReminderStatus::Pending,
            title: self.title.clone(),
            frequency: Some(self.frequency),
            due_at: self.trigger(now),
            due,
            source: ReminderSource::Local,
        }
    }
}

/// Picks the authoritative view: the server's when it has one, otherwise the local heuristic.
#[must_use]
pub fn reconcile(
    server: Option<ReminderView>,
    local: &LocalReminder,
    reminder_type: ReminderType,
    now: DateTime<Utc>,
) -> ReminderView {
    server.unwrap_or_else(|| local.view(reminder_type, now))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::{TimeZone, Timelike};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn audit_config(frequency: Option<Frequency>, due_at: Option<DateTime<Utc>>) -> ReminderConfig {
        ReminderConfig {
            frequency,
            time_of_day: Some("09:00".to_string()),
            due_at,
            title: "Review categories".to_string(),
        }
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let past = Some(now - Duration::minutes(1));
        let future = Some(now + Duration::minutes(1));
        assert!(is_due(ReminderStatus::Pending, past, now));
        assert!(!is_due(ReminderStatus::Pending, future, now));
        assert!(!is_due(ReminderStatus::Done, past, now));
        assert!(!is_due(ReminderStatus::Snooze, past, now));
        assert!(!is_due(ReminderStatus::Pending, None, now));
    }

    #[test]
    fn test_next_period_boundary() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        // Wednesday 2026-06-10
        let now = local(2026, 6, 10, 14, 30);

        let daily = next_period_boundary(Frequency::Daily, nine, now).unwrap();
        assert_eq!(daily, local(2026, 6, 11, 9, 0));

        let weekly = next_period_boundary(Frequency::Weekly, nine, now).unwrap();
        assert_eq!(weekly, local(2026, 6, 15, 9, 0));

        let monthly = next_period_boundary(Frequency::Monthly, nine, now).unwrap();
        assert_eq!(monthly, local(2026, 7, 1, 9, 0));
    }

    #[test]
    fn test_trigger_time_parse() {
        let mut config = audit_config(None, None);
        assert_eq!(config.trigger_time().unwrap().hour(), 9);
        config.time_of_day = Some("25:99".to_string());
        assert!(matches!(config.trigger_time(), Err(Error::Validation { .. })));
        config.time_of_day = None;
        assert_eq!(config.trigger_time().unwrap().hour(), 9);
    }

    #[test]
    fn test_local_reminder_due() {
        let mut reminder = LocalReminder::new("Audit", Frequency::Daily, 9);

        assert!(!reminder.is_due(local(2026, 6, 10, 8, 59)));
        assert!(reminder.is_due(local(2026, 6, 10, 9, 0)));

        // Shown at 10:00; suppressed for the snooze window
        reminder.last_shown_at = Some(local(2026, 6, 10, 10, 0));
        assert!(!reminder.is_due(local(2026, 6, 10, 11, 0)));
        assert!(reminder.is_due(local(2026, 6, 10, 12, 0)));

        // Completed in this period
        reminder.last_completed_at = Some(local(2026, 6, 10, 12, 5));
        assert!(!reminder.is_due(local(2026, 6, 10, 18, 0)));

        // Next day it is due again
        assert!(reminder.is_due(local(2026, 6, 11, 9, 30)));
    }

    #[test]
    fn test_local_weekly_reminder() {
        let mut reminder = LocalReminder::new("Weekly audit", Frequency::Weekly, 20);
        // Completed Monday evening; nothing more that week
        reminder.last_completed_at = Some(local(2026, 6, 8, 21, 0));
        assert!(!reminder.is_due(local(2026, 6, 12, 21, 0)));
        assert!(reminder.is_due(local(2026, 6, 15, 20, 30)));
    }

    #[test]
    fn test_reconcile_prefers_server() {
        let now = Utc::now();
        let local_reminder = LocalReminder::new("Audit", Frequency::Daily, 0);
        let server = ReminderView {
            id: Some(7),
            reminder_type: ReminderType::Audit,
            status: ReminderStatus::Done,
            title: "Audit".to_string(),
            frequency: Some(Frequency::Daily),
            due_at: None,
            due: false,
            source: ReminderSource::Server,
        };

        let chosen = reconcile(Some(server.clone()), &local_reminder, ReminderType::Audit, now);
        assert_eq!(chosen, server);

        let fallback = reconcile(None, &local_reminder, ReminderType::Audit, now);
        assert_eq!(fallback.source, ReminderSource::Local);
        assert_eq!(fallback.id, None);
    }

    #[tokio::test]
    async fn test_create_requires_due_at_for_one_off() -> Result<()> {
        let db = setup_test_db().await?;
        let result =
            create_reminder(&db, DEMO_USER, ReminderType::Bill, audit_config(None, None), Utc::now())
                .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut untitled = audit_config(Some(Frequency::Daily), None);
        untitled.title = " ".to_string();
        let result =
            create_reminder(&db, DEMO_USER, ReminderType::Audit, untitled, Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_recurring_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let now = local(2026, 6, 10, 10, 0);

        let created = create_reminder(
            &db,
            DEMO_USER,
            ReminderType::Audit,
            audit_config(Some(Frequency::Daily), None),
            now,
        )
        .await?;
        assert_eq!(created.status, ReminderStatus::Pending);
        assert_eq!(created.due_at, Some(local(2026, 6, 10, 9, 0)));
        assert!(created.due);
        let id = created.id.unwrap();

        let done = mark_done(&db, DEMO_USER, id, now).await?;
        assert_eq!(done.status, ReminderStatus::Done);
        assert_eq!(done.due_at, Some(local(2026, 6, 11, 9, 0)));
        assert!(!done.due);

        // Same day: still done
        let listed = list_reminders(&db, DEMO_USER, local(2026, 6, 10, 23, 0)).await?;
        assert_eq!(listed[0].status, ReminderStatus::Done);

        // Next period boundary reached: back to pending and due
        let listed = list_reminders(&db, DEMO_USER, local(2026, 6, 11, 9, 5)).await?;
        assert_eq!(listed[0].status, ReminderStatus::Pending);
        assert!(listed[0].due);
        Ok(())
    }

    #[tokio::test]
    async fn test_snooze() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let created = create_reminder(
            &db,
            DEMO_USER,
            ReminderType::Bill,
            audit_config(None, Some(now - Duration::minutes(5))),
            now,
        )
        .await?;
        assert!(created.due);
        let id = created.id.unwrap();

        let snoozed = snooze(&db, DEMO_USER, id, None, now).await?;
        assert_eq!(snoozed.status, ReminderStatus::Snooze);
        assert_eq!(snoozed.due_at, Some(now + Duration::minutes(120)));

        let later = list_reminders(&db, DEMO_USER, now + Duration::minutes(121)).await?;
        assert_eq!(later[0].status, ReminderStatus::Pending);
        assert!(later[0].due);

        let invalid = snooze(&db, DEMO_USER, id, Some(0), now).await;
        assert!(matches!(invalid, Err(Error::Validation { .. })));

        let missing = snooze(&db, DEMO_USER, 999, None, now).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_off_done_stays_done() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let created = create_reminder(
            &db,
            DEMO_USER,
            ReminderType::Bill,
            audit_config(None, Some(now)),
            now,
        )
        .await?;
        mark_done(&db, DEMO_USER, created.id.unwrap(), now).await?;

        let listed = list_reminders(&db, DEMO_USER, now + Duration::days(30)).await?;
        assert_eq!(listed[0].status, ReminderStatus::Done);
        assert!(!listed[0].due);
        Ok(())
    }
}
