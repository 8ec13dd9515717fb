use chrono::Utc;
use diesel::prelude::*;

use accord_core::db::DbConnection;
use accord_core::goals::{
    ConfirmationStatus, Goal, GoalConfirmation, GoalParticipant, GoalRepositoryTrait, GoalStatus,
};
use accord_core::Result;

use super::model::{GoalConfirmationDB, GoalDB, GoalParticipantDB};
use crate::errors::StorageError;
use crate::schema::{goal_confirmations, goal_participants, goals};

/// Stateless Diesel-backed goal repository.
///
/// Status transitions are compare-and-swap updates filtered on the expected
/// current status; the affected-row count tells the caller whether it won
/// the transition.
pub struct GoalRepository;

impl GoalRepository {
    pub fn new() -> Self {
        GoalRepository
    }
}

impl Default for GoalRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalRepositoryTrait for GoalRepository {
    fn insert_goal(&self, conn: &mut DbConnection, goal: &Goal) -> Result<()> {
        diesel::insert_into(goals::table)
            .values(GoalDB::from(goal))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_goal(&self, conn: &mut DbConnection, goal_id: &str) -> Result<Goal> {
        let goal_db = goals::table
            .find(goal_id)
            .first::<GoalDB>(conn)
            .map_err(StorageError::from)?;
        Goal::try_from(goal_db)
    }

    fn find_open_goal(&self, conn: &mut DbConnection, group_id: &str) -> Result<Option<Goal>> {
        let open: Vec<&str> = GoalStatus::OPEN.iter().map(|s| s.as_str()).collect();
        let goal_db = goals::table
            .filter(goals::group_id.eq(group_id))
            .filter(goals::status.eq_any(open))
            .first::<GoalDB>(conn)
            .optional()
            .map_err(StorageError::from)?;
        goal_db.map(Goal::try_from).transpose()
    }

    fn list_goals_with_status(
        &self,
        conn: &mut DbConnection,
        statuses: &[GoalStatus],
    ) -> Result<Vec<Goal>> {
        let wanted: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let goals_db = goals::table
            .filter(goals::status.eq_any(wanted))
            .order(goals::created_at.asc())
            .load::<GoalDB>(conn)
            .map_err(StorageError::from)?;
        goals_db.into_iter().map(Goal::try_from).collect()
    }

    fn update_goal_fields(&self, conn: &mut DbConnection, goal: &Goal) -> Result<()> {
        diesel::update(goals::table.find(&goal.id))
            .set((
                goals::name.eq(&goal.name),
                goals::category.eq(&goal.category),
                goals::target_value.eq(goal.target_value),
                goals::unit.eq(&goal.unit),
                goals::start_date.eq(goal.start_date),
                goals::end_date.eq(goal.end_date),
                goals::reward_punishment.eq(&goal.reward_punishment),
                goals::evidence_requirement.eq(&goal.evidence_requirement),
                goals::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn update_status_if(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
        expected: GoalStatus,
        new_status: GoalStatus,
    ) -> Result<bool> {
        let affected = diesel::update(
            goals::table
                .find(goal_id)
                .filter(goals::status.eq(expected.as_str())),
        )
        .set((
            goals::status.eq(new_status.as_str()),
            goals::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(affected > 0)
    }

    fn insert_confirmation(
        &self,
        conn: &mut DbConnection,
        confirmation: &GoalConfirmation,
    ) -> Result<()> {
        diesel::insert_into(goal_confirmations::table)
            .values(GoalConfirmationDB::from(confirmation))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn list_confirmations(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalConfirmation>> {
        let confirmations_db = goal_confirmations::table
            .filter(goal_confirmations::goal_id.eq(goal_id))
            .order(goal_confirmations::created_at.asc())
            .load::<GoalConfirmationDB>(conn)
            .map_err(StorageError::from)?;
        confirmations_db
            .into_iter()
            .map(GoalConfirmation::try_from)
            .collect()
    }

    fn update_confirmation_if_pending(
        &self,
        conn: &mut DbConnection,
        confirmation_id: &str,
        status: ConfirmationStatus,
    ) -> Result<bool> {
        let affected = diesel::update(
            goal_confirmations::table
                .find(confirmation_id)
                .filter(goal_confirmations::status.eq(ConfirmationStatus::Pending.as_str())),
        )
        .set(goal_confirmations::status.eq(status.as_str()))
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(affected > 0)
    }

    fn delete_confirmations(&self, conn: &mut DbConnection, goal_id: &str) -> Result<usize> {
        let deleted =
            diesel::delete(goal_confirmations::table.filter(goal_confirmations::goal_id.eq(goal_id)))
                .execute(conn)
                .map_err(StorageError::from)?;
        Ok(deleted)
    }

    fn insert_participant(
        &self,
        conn: &mut DbConnection,
        participant: &GoalParticipant,
    ) -> Result<()> {
        diesel::insert_into(goal_participants::table)
            .values(GoalParticipantDB::from(participant))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn list_participants(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalParticipant>> {
        let participants_db = goal_participants::table
            .filter(goal_participants::goal_id.eq(goal_id))
            .order(goal_participants::created_at.asc())
            .load::<GoalParticipantDB>(conn)
            .map_err(StorageError::from)?;
        Ok(participants_db
            .into_iter()
            .map(GoalParticipant::from)
            .collect())
    }

    fn find_participant(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
        member_id: &str,
    ) -> Result<Option<GoalParticipant>> {
        let participant_db = goal_participants::table
            .filter(goal_participants::goal_id.eq(goal_id))
            .filter(goal_participants::member_id.eq(member_id))
            .first::<GoalParticipantDB>(conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(participant_db.map(GoalParticipant::from))
    }

    fn delete_participants(&self, conn: &mut DbConnection, goal_id: &str) -> Result<usize> {
        let deleted =
            diesel::delete(goal_participants::table.filter(goal_participants::goal_id.eq(goal_id)))
                .execute(conn)
                .map_err(StorageError::from)?;
        Ok(deleted)
    }
}
