//! Database models for goals, confirmations, and participants.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use accord_core::errors::Error;
use accord_core::goals::{
    ConfirmationStatus, Goal, GoalConfirmation, GoalParticipant, GoalStatus,
};

use crate::errors::unknown_enum_value;

/// Database model for goals
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalDB {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub category: String,
    pub target_value: f64,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reward_punishment: String,
    pub evidence_requirement: String,
    pub status: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for per-member goal confirmations
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::goal_confirmations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalConfirmationDB {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// Database model for goal participants
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::goal_participants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GoalParticipantDB {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<GoalDB> for Goal {
    type Error = Error;

    fn try_from(db: GoalDB) -> Result<Self, Error> {
        let status = GoalStatus::from_str(&db.status)
            .ok_or_else(|| unknown_enum_value("goals.status", &db.status))?;
        Ok(Self {
            id: db.id,
            group_id: db.group_id,
            name: db.name,
            category: db.category,
            target_value: db.target_value,
            unit: db.unit,
            start_date: db.start_date,
            end_date: db.end_date,
            reward_punishment: db.reward_punishment,
            evidence_requirement: db.evidence_requirement,
            status,
            created_by: db.created_by,
            created_at: Utc.from_utc_datetime(&db.created_at),
            updated_at: Utc.from_utc_datetime(&db.updated_at),
        })
    }
}

impl From<&Goal> for GoalDB {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id.clone(),
            group_id: goal.group_id.clone(),
            name: goal.name.clone(),
            category: goal.category.clone(),
            target_value: goal.target_value,
            unit: goal.unit.clone(),
            start_date: goal.start_date,
            end_date: goal.end_date,
            reward_punishment: goal.reward_punishment.clone(),
            evidence_requirement: goal.evidence_requirement.clone(),
            status: goal.status.as_str().to_string(),
            created_by: goal.created_by.clone(),
            created_at: goal.created_at.naive_utc(),
            updated_at: goal.updated_at.naive_utc(),
        }
    }
}

impl TryFrom<GoalConfirmationDB> for GoalConfirmation {
    type Error = Error;

    fn try_from(db: GoalConfirmationDB) -> Result<Self, Error> {
        let status = ConfirmationStatus::from_str(&db.status)
            .ok_or_else(|| unknown_enum_value("goal_confirmations.status", &db.status))?;
        Ok(Self {
            id: db.id,
            goal_id: db.goal_id,
            member_id: db.member_id,
            status,
            created_at: Utc.from_utc_datetime(&db.created_at),
        })
    }
}

impl From<&GoalConfirmation> for GoalConfirmationDB {
    fn from(confirmation: &GoalConfirmation) -> Self {
        Self {
            id: confirmation.id.clone(),
            goal_id: confirmation.goal_id.clone(),
            member_id: confirmation.member_id.clone(),
            status: confirmation.status.as_str().to_string(),
            created_at: confirmation.created_at.naive_utc(),
        }
    }
}

impl From<GoalParticipantDB> for GoalParticipant {
    fn from(db: GoalParticipantDB) -> Self {
        Self {
            id: db.id,
            goal_id: db.goal_id,
            member_id: db.member_id,
            created_at: Utc.from_utc_datetime(&db.created_at),
        }
    }
}

impl From<&GoalParticipant> for GoalParticipantDB {
    fn from(participant: &GoalParticipant) -> Self {
        Self {
            id: participant.id.clone(),
            goal_id: participant.goal_id.clone(),
            member_id: participant.member_id.clone(),
            created_at: participant.created_at.naive_utc(),
        }
    }
}
