use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::change_requests::change_requests_model::{
    ChangeRequest, ChangeRequestDetail, ChangeRequestStatus, ChangeRequestType, ChangeVote,
    ProposedChanges, VoteStatus,
};
use crate::db::DbConnection;
use crate::errors::Result;

/// Repository operations for change requests and votes.
pub trait ChangeRequestRepositoryTrait: Send + Sync {
    fn insert_request(&self, conn: &mut DbConnection, request: &ChangeRequest) -> Result<()>;
    fn get_request(&self, conn: &mut DbConnection, request_id: &str) -> Result<ChangeRequest>;

    /// The goal's PENDING request, if any. At most one exists by invariant.
    fn find_open_request(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Option<ChangeRequest>>;

    /// All PENDING requests across groups (scheduler sweeps).
    fn list_open_requests(&self, conn: &mut DbConnection) -> Result<Vec<ChangeRequest>>;

    /// Compare-and-swap from PENDING to a terminal status. Returns true when
    /// this caller performed the transition.
    fn resolve_request_if_pending(
        &self,
        conn: &mut DbConnection,
        request_id: &str,
        status: ChangeRequestStatus,
    ) -> Result<bool>;

    fn insert_vote(&self, conn: &mut DbConnection, vote: &ChangeVote) -> Result<()>;
    fn list_votes(&self, conn: &mut DbConnection, request_id: &str) -> Result<Vec<ChangeVote>>;

    /// Records a member's vote; returns false if the vote row was no longer
    /// pending (votes are immutable once cast).
    fn update_vote_if_pending(
        &self,
        conn: &mut DbConnection,
        vote_id: &str,
        status: VoteStatus,
    ) -> Result<bool>;
}

/// Service operations for the change-request engine.
#[async_trait]
pub trait ChangeRequestServiceTrait: Send + Sync {
    /// Opens a proposal against the group's current goal. The initiator is
    /// auto-approved; in a single-member group the request applies
    /// immediately.
    async fn create_change_request(
        &self,
        goal_id: &str,
        user_id: &str,
        request_type: ChangeRequestType,
        proposed_changes: Option<ProposedChanges>,
    ) -> Result<ChangeRequest>;

    /// Casts a member's vote. Any rejection resolves the request REJECTED;
    /// unanimous approval over the live roster applies it.
    async fn vote(&self, request_id: &str, user_id: &str, approved: bool) -> Result<ChangeRequest>;

    fn get_change_request(&self, request_id: &str) -> Result<ChangeRequestDetail>;

    /// Scheduler entry point: marks PENDING requests EXPIRED once their
    /// effective expiry has passed. Returns how many were expired.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Scheduler entry point: voids PENDING requests whose goal has left the
    /// open statuses by any path. Returns how many were voided.
    async fn void_orphaned(&self) -> Result<usize>;
}
