use chrono::Utc;
use diesel::prelude::*;

use accord_core::change_requests::{
    ChangeRequest, ChangeRequestRepositoryTrait, ChangeRequestStatus, ChangeVote, VoteStatus,
};
use accord_core::db::DbConnection;
use accord_core::Result;

use super::model::{ChangeRequestDB, ChangeVoteDB};
use crate::errors::StorageError;
use crate::schema::{change_requests, change_votes};

/// Stateless Diesel-backed change-request repository.
pub struct ChangeRequestRepository;

impl ChangeRequestRepository {
    pub fn new() -> Self {
        ChangeRequestRepository
    }
}

impl Default for ChangeRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeRequestRepositoryTrait for ChangeRequestRepository {
    fn insert_request(&self, conn: &mut DbConnection, request: &ChangeRequest) -> Result<()> {
        let request_db = ChangeRequestDB::try_from(request)?;
        diesel::insert_into(change_requests::table)
            .values(request_db)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_request(&self, conn: &mut DbConnection, request_id: &str) -> Result<ChangeRequest> {
        let request_db = change_requests::table
            .find(request_id)
            .first::<ChangeRequestDB>(conn)
            .map_err(StorageError::from)?;
        ChangeRequest::try_from(request_db)
    }

    fn find_open_request(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Option<ChangeRequest>> {
        let request_db = change_requests::table
            .filter(change_requests::goal_id.eq(goal_id))
            .filter(change_requests::status.eq(ChangeRequestStatus::Pending.as_str()))
            .first::<ChangeRequestDB>(conn)
            .optional()
            .map_err(StorageError::from)?;
        request_db.map(ChangeRequest::try_from).transpose()
    }

    fn list_open_requests(&self, conn: &mut DbConnection) -> Result<Vec<ChangeRequest>> {
        let requests_db = change_requests::table
            .filter(change_requests::status.eq(ChangeRequestStatus::Pending.as_str()))
            .order(change_requests::created_at.asc())
            .load::<ChangeRequestDB>(conn)
            .map_err(StorageError::from)?;
        requests_db.into_iter().map(ChangeRequest::try_from).collect()
    }

    fn resolve_request_if_pending(
        &self,
        conn: &mut DbConnection,
        request_id: &str,
        status: ChangeRequestStatus,
    ) -> Result<bool> {
        let affected = diesel::update(
            change_requests::table
                .find(request_id)
                .filter(change_requests::status.eq(ChangeRequestStatus::Pending.as_str())),
        )
        .set((
            change_requests::status.eq(status.as_str()),
            change_requests::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(affected > 0)
    }

    fn insert_vote(&self, conn: &mut DbConnection, vote: &ChangeVote) -> Result<()> {
        diesel::insert_into(change_votes::table)
            .values(ChangeVoteDB::from(vote))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn list_votes(&self, conn: &mut DbConnection, request_id: &str) -> Result<Vec<ChangeVote>> {
        let votes_db = change_votes::table
            .filter(change_votes::request_id.eq(request_id))
            .order(change_votes::created_at.asc())
            .load::<ChangeVoteDB>(conn)
            .map_err(StorageError::from)?;
        votes_db.into_iter().map(ChangeVote::try_from).collect()
    }

    fn update_vote_if_pending(
        &self,
        conn: &mut DbConnection,
        vote_id: &str,
        status: VoteStatus,
    ) -> Result<bool> {
        let affected = diesel::update(
            change_votes::table
                .find(vote_id)
                .filter(change_votes::status.eq(VoteStatus::Pending.as_str())),
        )
        .set(change_votes::status.eq(status.as_str()))
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(affected > 0)
    }
}
