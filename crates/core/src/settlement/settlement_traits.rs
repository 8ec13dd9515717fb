use async_trait::async_trait;

use crate::db::DbConnection;
use crate::errors::Result;
use crate::settlement::settlement_model::{
    CategoryCompletion, SettlementConfirmation, SettlementResult,
};

/// Repository operations for settlement confirmations and category
/// completion streaks.
pub trait SettlementRepositoryTrait: Send + Sync {
    fn insert_confirmation(
        &self,
        conn: &mut DbConnection,
        confirmation: &SettlementConfirmation,
    ) -> Result<()>;
    fn list_confirmations(
        &self,
        conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<SettlementConfirmation>>;

    fn find_category_completion(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<Option<CategoryCompletion>>;

    /// Adds one to the (group, user, category) streak, creating the row at
    /// count 1 if absent. Returns the updated row.
    fn increment_category_completion(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<CategoryCompletion>;
}

/// Service operations for settlement and archival.
#[async_trait]
pub trait SettlementServiceTrait: Send + Sync {
    /// Records a supervisor's sign-off on a SETTLING goal, then attempts
    /// archival. Returns the settlement projection as of after the call.
    async fn confirm_settlement(&self, goal_id: &str, user_id: &str) -> Result<SettlementResult>;

    /// Attempts the SETTLING -> ARCHIVED compare-and-swap. Idempotent: the
    /// loser of a concurrent race observes the archived goal and returns
    /// success without double-counting. Returns true when a transition (by
    /// anyone) has happened, false when archival preconditions are not met
    /// yet.
    async fn try_archive(&self, goal_id: &str) -> Result<bool>;

    /// Read projection, valid for SETTLING or ARCHIVED goals.
    fn get_settlement_result(&self, goal_id: &str) -> Result<SettlementResult>;
}
