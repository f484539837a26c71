//! Family business logic - Families, their members and shared ledgers.
//!
//! Every family gets exactly one shared ledger when it is created. A ledger is
//! accessible to its owner and, for family ledgers, to every member.

use crate::{
    core::incentive::{self, SideEffect},
    entities::{
        Family, FamilyMember, Ledger, User, family, family_member, family_member::FamilyRole,
        ledger,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::info;

/// A newly created family with its shared ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCreated {
    /// The family
    pub family: family::Model,
    /// Its shared ledger
    pub ledger: ledger::Model,
    /// `FAMILY_FIRST` unlock
    pub achievement: SideEffect,
}

/// Creates a family owned by `owner_id`, enrolls the owner and opens the shared ledger.
///
/// # Errors
/// * [`Error::Validation`] if `name` is blank
pub async fn create_family(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    now: DateTime<Utc>,
) -> Result<FamilyCreated> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("family name is required"));
    }

    let txn = db.begin().await?;

    let family = family::ActiveModel {
        name: Set(name.to_string()),
        owner_id: Set(owner_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    family_member::ActiveModel {
        family_id: Set(family.id),
        user_id: Set(owner_id),
        role: Set(FamilyRole::Owner),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let ledger = ledger::ActiveModel {
        name: Set(format!("{name} ledger")),
        owner_id: Set(owner_id),
        family_id: Set(Some(family.id)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(family_id = family.id, owner_id, "family created");

    let achievement =
        incentive::unlock_achievement_best_effort(db, owner_id, incentive::FAMILY_FIRST, now)
            .await;

    Ok(FamilyCreated {
        family,
        ledger,
        achievement,
    })
}

/// Adds `user_id` to the family. Only the owner may add members.
///
/// # Errors
/// * [`Error::NotFound`] if the family or user does not exist
/// * [`Error::Validation`] if `actor_id` is not the owner or the user is already a member
pub async fn add_member(
    db: &DatabaseConnection,
    actor_id: i64,
    family_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<family_member::Model> {
    let family = Family::find_by_id(family_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Family", family_id))?;

    if family.owner_id != actor_id {
        return Err(Error::validation("only the family owner can add members"));
    }

    if User::find_by_id(user_id).one(db).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let member = family_member::ActiveModel {
        family_id: Set(family_id),
        user_id: Set(user_id),
        role: Set(FamilyRole::Member),
        joined_at: Set(now),
        ..Default::default()
    };

    match member.insert(db).await {
        Ok(member) => Ok(member),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Err(
            Error::validation(format!("user {user_id} is already a member")),
        ),
        Err(e) => Err(e.into()),
    }
}

async fn family_ids_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<i64>> {
    Ok(FamilyMember::find()
        .filter(family_member::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.family_id)
        .collect())
}

/// Ledgers the user owns plus the shared ledgers of every family they belong to.
pub async fn ledgers_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<ledger::Model>> {
    let family_ids = family_ids_for_user(db, user_id).await?;

    Ok(Ledger::find()
        .filter(
            Condition::any()
                .add(ledger::Column::OwnerId.eq(user_id))
                .add(ledger::Column::FamilyId.is_in(family_ids)),
        )
        .order_by_asc(ledger::Column::Id)
        .all(db)
        .await?)
}

/// Whether the user may file transactions under `ledger_id`.
pub async fn can_access_ledger(
    db: &DatabaseConnection,
    user_id: i64,
    ledger_id: i64,
) -> Result<bool> {
    let Some(ledger) = Ledger::find_by_id(ledger_id).one(db).await? else {
        return Ok(false);
    };
    if ledger.owner_id == user_id {
        return Ok(true);
    }
    let Some(family_id) = ledger.family_id else {
        return Ok(false);
    };

    let membership = FamilyMember::find()
        .filter(family_member::Column::FamilyId.eq(family_id))
        .filter(family_member::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(membership.is_some())
}
