use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use accord_core::db::DbConnection;
use accord_core::settlement::{
    CategoryCompletion, SettlementConfirmation, SettlementRepositoryTrait,
};
use accord_core::Result;

use super::model::{CategoryCompletionDB, SettlementConfirmationDB};
use crate::errors::StorageError;
use crate::schema::{category_completions, settlement_confirmations};

/// Stateless Diesel-backed settlement repository.
pub struct SettlementRepository;

impl SettlementRepository {
    pub fn new() -> Self {
        SettlementRepository
    }
}

impl Default for SettlementRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SettlementRepositoryTrait for SettlementRepository {
    fn insert_confirmation(
        &self,
        conn: &mut DbConnection,
        confirmation: &SettlementConfirmation,
    ) -> Result<()> {
        diesel::insert_into(settlement_confirmations::table)
            .values(SettlementConfirmationDB::from(confirmation))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn list_confirmations(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<SettlementConfirmation>> {
        let confirmations_db = settlement_confirmations::table
            .filter(settlement_confirmations::goal_id.eq(goal_id))
            .order(settlement_confirmations::created_at.asc())
            .load::<SettlementConfirmationDB>(conn)
            .map_err(StorageError::from)?;
        Ok(confirmations_db
            .into_iter()
            .map(SettlementConfirmation::from)
            .collect())
    }

    fn find_category_completion(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<Option<CategoryCompletion>> {
        let completion_db = category_completions::table
            .filter(category_completions::group_id.eq(group_id))
            .filter(category_completions::user_id.eq(user_id))
            .filter(category_completions::category.eq(category))
            .first::<CategoryCompletionDB>(conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(completion_db.map(CategoryCompletion::from))
    }

    fn increment_category_completion(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<CategoryCompletion> {
        let now = Utc::now().naive_utc();
        let fresh = CategoryCompletionDB {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            category: category.to_string(),
            completion_count: 1,
            updated_at: now,
        };

        let completion_db = diesel::insert_into(category_completions::table)
            .values(fresh)
            .on_conflict((
                category_completions::group_id,
                category_completions::user_id,
                category_completions::category,
            ))
            .do_update()
            .set((
                category_completions::completion_count
                    .eq(category_completions::completion_count + 1),
                category_completions::updated_at.eq(now),
            ))
            .returning(CategoryCompletionDB::as_returning())
            .get_result::<CategoryCompletionDB>(conn)
            .map_err(StorageError::from)?;
        Ok(CategoryCompletion::from(completion_db))
    }
}
