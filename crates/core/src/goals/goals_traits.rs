use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbConnection;
use crate::errors::Result;
use crate::goals::goals_model::{
    ConfirmationStatus, Goal, GoalConfirmation, GoalDetail, GoalParticipant, GoalStatus, NewGoal,
};

/// Repository operations for goals, confirmations, and participants.
///
/// Status writes are conditional ("update if current status still is X") so
/// concurrent callers and the scheduler race safely; the boolean return says
/// whether this caller performed the transition.
pub trait GoalRepositoryTrait: Send + Sync {
    fn insert_goal(&self, conn: &mut DbConnection, goal: &Goal) -> Result<()>;
    fn get_goal(&self, conn: &mut DbConnection, goal_id: &str) -> Result<Goal>;

    /// The group's goal in PENDING/UPCOMING/ACTIVE, if any. At most one
    /// exists by invariant.
    fn find_open_goal(&self, conn: &mut DbConnection, group_id: &str) -> Result<Option<Goal>>;

    /// All goals currently in one of `statuses`, across groups (scheduler).
    fn list_goals_with_status(
        &self,
        conn: &mut DbConnection,
        statuses: &[GoalStatus],
    ) -> Result<Vec<Goal>>;

    /// Writes the mutable scalar fields (name, category, target, unit,
    /// dates, reward, evidence requirement) of an applied modification.
    fn update_goal_fields(&self, conn: &mut DbConnection, goal: &Goal) -> Result<()>;

    /// Compare-and-swap status update. Returns true when the row was in
    /// `expected` and is now `new_status`.
    fn update_status_if(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
        expected: GoalStatus,
        new_status: GoalStatus,
    ) -> Result<bool>;

    fn insert_confirmation(
        &self,
        conn: &mut DbConnection,
        confirmation: &GoalConfirmation,
    ) -> Result<()>;
    fn list_confirmations(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalConfirmation>>;

    /// Records a member's decision; returns false if the confirmation was no
    /// longer pending (someone raced us or it was reset).
    fn update_confirmation_if_pending(
        &self,
        conn: &mut DbConnection,
        confirmation_id: &str,
        status: ConfirmationStatus,
    ) -> Result<bool>;

    fn delete_confirmations(&self, conn: &mut DbConnection, goal_id: &str) -> Result<usize>;

    fn insert_participant(
        &self,
        conn: &mut DbConnection,
        participant: &GoalParticipant,
    ) -> Result<()>;
    fn list_participants(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalParticipant>>;
    fn find_participant(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
        member_id: &str,
    ) -> Result<Option<GoalParticipant>>;
    fn delete_participants(&self, conn: &mut DbConnection, goal_id: &str) -> Result<usize>;
}

/// Service operations for the goal lifecycle.
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    /// Creates a goal in PENDING with the creator auto-approved and every
    /// other current member holding a pending confirmation.
    async fn create_goal(&self, group_id: &str, user_id: &str, new_goal: NewGoal) -> Result<Goal>;

    /// Records a member's confirmation. Rejection voids the goal
    /// immediately; the final approval moves it to UPCOMING.
    async fn confirm_goal(&self, goal_id: &str, user_id: &str, approved: bool) -> Result<Goal>;

    fn get_goal_detail(&self, goal_id: &str) -> Result<GoalDetail>;

    /// Scheduler entry point: applies every time-driven transition due as of
    /// `now`, per group time zone, with the dependent change-request
    /// cascades. Returns the number of goals transitioned.
    async fn sweep_time_transitions(&self, now: DateTime<Utc>) -> Result<usize>;
}
