//! Database models for check-ins and reviews.
//!
//! Evidence references are persisted as a JSON text column; the file bytes
//! themselves live in the evidence store, not the database.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use accord_core::checkins::{
    Checkin, CheckinEvidence, CheckinReview, CheckinStatus, ReviewAction,
};
use accord_core::errors::Error;

use crate::errors::{unknown_enum_value, StorageError};

/// Database model for check-ins
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::checkins)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CheckinDB {
    pub id: String,
    pub goal_id: String,
    pub group_id: String,
    pub member_id: String,
    pub checkin_date: NaiveDate,
    pub value: f64,
    pub note: Option<String>,
    pub evidence: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for check-in reviews
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::checkin_reviews)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CheckinReviewDB {
    pub id: String,
    pub checkin_id: String,
    pub member_id: String,
    pub action: String,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<CheckinDB> for Checkin {
    type Error = Error;

    fn try_from(db: CheckinDB) -> Result<Self, Error> {
        let status = CheckinStatus::from_str(&db.status)
            .ok_or_else(|| unknown_enum_value("checkins.status", &db.status))?;
        let evidence: Vec<CheckinEvidence> = serde_json::from_str(&db.evidence)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: db.id,
            goal_id: db.goal_id,
            group_id: db.group_id,
            member_id: db.member_id,
            checkin_date: db.checkin_date,
            value: db.value,
            note: db.note,
            evidence,
            status,
            created_at: Utc.from_utc_datetime(&db.created_at),
            updated_at: Utc.from_utc_datetime(&db.updated_at),
        })
    }
}

impl TryFrom<&Checkin> for CheckinDB {
    type Error = Error;

    fn try_from(checkin: &Checkin) -> Result<Self, Error> {
        let evidence = serde_json::to_string(&checkin.evidence)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: checkin.id.clone(),
            goal_id: checkin.goal_id.clone(),
            group_id: checkin.group_id.clone(),
            member_id: checkin.member_id.clone(),
            checkin_date: checkin.checkin_date,
            value: checkin.value,
            note: checkin.note.clone(),
            evidence,
            status: checkin.status.as_str().to_string(),
            created_at: checkin.created_at.naive_utc(),
            updated_at: checkin.updated_at.naive_utc(),
        })
    }
}

impl TryFrom<CheckinReviewDB> for CheckinReview {
    type Error = Error;

    fn try_from(db: CheckinReviewDB) -> Result<Self, Error> {
        let action = ReviewAction::from_str(&db.action)
            .ok_or_else(|| unknown_enum_value("checkin_reviews.action", &db.action))?;
        Ok(Self {
            id: db.id,
            checkin_id: db.checkin_id,
            member_id: db.member_id,
            action,
            reason: db.reason,
            created_at: Utc.from_utc_datetime(&db.created_at),
        })
    }
}

impl From<&CheckinReview> for CheckinReviewDB {
    fn from(review: &CheckinReview) -> Self {
        Self {
            id: review.id.clone(),
            checkin_id: review.checkin_id.clone(),
            member_id: review.member_id.clone(),
            action: review.action.as_str().to_string(),
            reason: review.reason.clone(),
            created_at: review.created_at.naive_utc(),
        }
    }
}
