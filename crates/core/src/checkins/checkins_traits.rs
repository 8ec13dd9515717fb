use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checkins::checkins_model::{
    Checkin, CheckinReview, CheckinStatus, GoalProgress, NewCheckin, ReviewAction, StoredEvidence,
};
use crate::db::DbConnection;
use crate::errors::Result;

/// Repository operations for check-ins and reviews.
pub trait CheckinRepositoryTrait: Send + Sync {
    fn insert_checkin(&self, conn: &mut DbConnection, checkin: &Checkin) -> Result<()>;
    fn get_checkin(&self, conn: &mut DbConnection, checkin_id: &str) -> Result<Checkin>;
    fn list_checkins_for_goal(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<Checkin>>;

    /// Compare-and-swap status update; true when this caller performed it.
    fn update_status_if(
        &self,
        conn: &mut DbConnection,
        checkin_id: &str,
        expected: CheckinStatus,
        new_status: CheckinStatus,
    ) -> Result<bool>;

    fn count_pending_review(&self, conn: &mut DbConnection, goal_id: &str) -> Result<i64>;

    /// PENDING_REVIEW check-ins submitted at or before `cutoff` (scheduler
    /// auto-approval sweep).
    fn list_stale_pending(
        &self,
        conn: &mut DbConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Checkin>>;

    fn insert_review(&self, conn: &mut DbConnection, review: &CheckinReview) -> Result<()>;
    fn list_reviews(&self, conn: &mut DbConnection, checkin_id: &str)
        -> Result<Vec<CheckinReview>>;
}

/// Opaque capability for storing evidence files.
///
/// Invoked before the check-in transaction; on transaction failure the
/// service issues compensating deletes. Implementations validate nothing;
/// the service enforces extension and size rules first.
pub trait EvidenceStoreTrait: Send + Sync {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredEvidence>;
    fn delete(&self, path: &str) -> Result<()>;
}

/// Service operations for the check-in review engine.
#[async_trait]
pub trait CheckinServiceTrait: Send + Sync {
    /// Submits a check-in for a participating challenger on an active goal.
    async fn submit_checkin(&self, user_id: &str, new_checkin: NewCheckin) -> Result<Checkin>;

    /// Records a supervisor's verdict. A single dispute vetoes the check-in;
    /// confirmation accumulates until every live supervisor has confirmed.
    async fn review_checkin(
        &self,
        checkin_id: &str,
        user_id: &str,
        action: ReviewAction,
        reason: Option<String>,
    ) -> Result<Checkin>;

    fn get_progress(&self, goal_id: &str) -> Result<GoalProgress>;

    /// Scheduler entry point: auto-approves check-ins pending review for
    /// more than the wall-clock review window. Returns how many changed.
    async fn auto_approve_stale(&self, now: DateTime<Utc>) -> Result<usize>;
}
