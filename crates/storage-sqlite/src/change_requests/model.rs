//! Database models for change requests and votes.
//!
//! `proposed_changes` is persisted as a JSON text column; the partial field
//! set does not warrant its own table.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use accord_core::change_requests::{
    ChangeRequest, ChangeRequestStatus, ChangeRequestType, ChangeVote, ProposedChanges, VoteStatus,
};
use accord_core::errors::Error;

use crate::errors::{unknown_enum_value, StorageError};

/// Database model for change requests
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::change_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChangeRequestDB {
    pub id: String,
    pub goal_id: String,
    pub group_id: String,
    pub request_type: String,
    pub status: String,
    pub proposed_changes: Option<String>,
    pub created_by: String,
    pub expires_at: NaiveDateTime,
    pub effective_expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for change votes
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::change_votes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChangeVoteDB {
    pub id: String,
    pub request_id: String,
    pub member_id: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<ChangeRequestDB> for ChangeRequest {
    type Error = Error;

    fn try_from(db: ChangeRequestDB) -> Result<Self, Error> {
        let request_type = ChangeRequestType::from_str(&db.request_type).ok_or_else(|| {
            unknown_enum_value("change_requests.request_type", &db.request_type)
        })?;
        let status = ChangeRequestStatus::from_str(&db.status)
            .ok_or_else(|| unknown_enum_value("change_requests.status", &db.status))?;
        let proposed_changes = db
            .proposed_changes
            .as_deref()
            .map(serde_json::from_str::<ProposedChanges>)
            .transpose()
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: db.id,
            goal_id: db.goal_id,
            group_id: db.group_id,
            request_type,
            status,
            proposed_changes,
            created_by: db.created_by,
            expires_at: Utc.from_utc_datetime(&db.expires_at),
            effective_expires_at: Utc.from_utc_datetime(&db.effective_expires_at),
            created_at: Utc.from_utc_datetime(&db.created_at),
            updated_at: Utc.from_utc_datetime(&db.updated_at),
        })
    }
}

impl TryFrom<&ChangeRequest> for ChangeRequestDB {
    type Error = Error;

    fn try_from(request: &ChangeRequest) -> Result<Self, Error> {
        let proposed_changes = request
            .proposed_changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: request.id.clone(),
            goal_id: request.goal_id.clone(),
            group_id: request.group_id.clone(),
            request_type: request.request_type.as_str().to_string(),
            status: request.status.as_str().to_string(),
            proposed_changes,
            created_by: request.created_by.clone(),
            expires_at: request.expires_at.naive_utc(),
            effective_expires_at: request.effective_expires_at.naive_utc(),
            created_at: request.created_at.naive_utc(),
            updated_at: request.updated_at.naive_utc(),
        })
    }
}

impl TryFrom<ChangeVoteDB> for ChangeVote {
    type Error = Error;

    fn try_from(db: ChangeVoteDB) -> Result<Self, Error> {
        let status = VoteStatus::from_str(&db.status)
            .ok_or_else(|| unknown_enum_value("change_votes.status", &db.status))?;
        Ok(Self {
            id: db.id,
            request_id: db.request_id,
            member_id: db.member_id,
            status,
            created_at: Utc.from_utc_datetime(&db.created_at),
        })
    }
}

impl From<&ChangeVote> for ChangeVoteDB {
    fn from(vote: &ChangeVote) -> Self {
        Self {
            id: vote.id.clone(),
            request_id: vote.request_id.clone(),
            member_id: vote.member_id.clone(),
            status: vote.status.as_str().to_string(),
            created_at: vote.created_at.naive_utc(),
        }
    }
}
