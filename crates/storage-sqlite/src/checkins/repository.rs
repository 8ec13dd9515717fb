use chrono::{DateTime, Utc};
use diesel::prelude::*;

use accord_core::checkins::{Checkin, CheckinRepositoryTrait, CheckinReview, CheckinStatus};
use accord_core::db::DbConnection;
use accord_core::Result;

use super::model::{CheckinDB, CheckinReviewDB};
use crate::errors::StorageError;
use crate::schema::{checkin_reviews, checkins};

/// Stateless Diesel-backed check-in repository.
pub struct CheckinRepository;

impl CheckinRepository {
    pub fn new() -> Self {
        CheckinRepository
    }
}

impl Default for CheckinRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckinRepositoryTrait for CheckinRepository {
    fn insert_checkin(&self, conn: &mut DbConnection, checkin: &Checkin) -> Result<()> {
        let checkin_db = CheckinDB::try_from(checkin)?;
        diesel::insert_into(checkins::table)
            .values(checkin_db)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_checkin(&self, conn: &mut DbConnection, checkin_id: &str) -> Result<Checkin> {
        let checkin_db = checkins::table
            .find(checkin_id)
            .first::<CheckinDB>(conn)
            .map_err(StorageError::from)?;
        Checkin::try_from(checkin_db)
    }

    fn list_checkins_for_goal(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<Checkin>> {
        let checkins_db = checkins::table
            .filter(checkins::goal_id.eq(goal_id))
            .order((checkins::checkin_date.asc(), checkins::created_at.asc()))
            .load::<CheckinDB>(conn)
            .map_err(StorageError::from)?;
        checkins_db.into_iter().map(Checkin::try_from).collect()
    }

    fn update_status_if(
        &self,
        conn: &mut DbConnection,
        checkin_id: &str,
        expected: CheckinStatus,
        new_status: CheckinStatus,
    ) -> Result<bool> {
        let affected = diesel::update(
            checkins::table
                .find(checkin_id)
                .filter(checkins::status.eq(expected.as_str())),
        )
        .set((
            checkins::status.eq(new_status.as_str()),
            checkins::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(affected > 0)
    }

    fn count_pending_review(&self, conn: &mut DbConnection, goal_id: &str) -> Result<i64> {
        let count = checkins::table
            .filter(checkins::goal_id.eq(goal_id))
            .filter(checkins::status.eq(CheckinStatus::PendingReview.as_str()))
            .count()
            .get_result::<i64>(conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }

    fn list_stale_pending(
        &self,
        conn: &mut DbConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Checkin>> {
        let checkins_db = checkins::table
            .filter(checkins::status.eq(CheckinStatus::PendingReview.as_str()))
            .filter(checkins::created_at.le(cutoff.naive_utc()))
            .order(checkins::created_at.asc())
            .load::<CheckinDB>(conn)
            .map_err(StorageError::from)?;
        checkins_db.into_iter().map(Checkin::try_from).collect()
    }

    fn insert_review(&self, conn: &mut DbConnection, review: &CheckinReview) -> Result<()> {
        diesel::insert_into(checkin_reviews::table)
            .values(CheckinReviewDB::from(review))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn list_reviews(
        &self,
        conn: &mut DbConnection,
        checkin_id: &str,
    ) -> Result<Vec<CheckinReview>> {
        let reviews_db = checkin_reviews::table
            .filter(checkin_reviews::checkin_id.eq(checkin_id))
            .order(checkin_reviews::created_at.asc())
            .load::<CheckinReviewDB>(conn)
            .map_err(StorageError::from)?;
        reviews_db.into_iter().map(CheckinReview::try_from).collect()
    }
}
