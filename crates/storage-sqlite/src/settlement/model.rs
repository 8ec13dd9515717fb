//! Database models for settlement sign-offs and category completion streaks.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use accord_core::settlement::{CategoryCompletion, SettlementConfirmation};

/// Database model for settlement confirmations
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::settlement_confirmations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SettlementConfirmationDB {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub created_at: NaiveDateTime,
}

/// Database model for category completion streaks
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::category_completions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryCompletionDB {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub category: String,
    pub completion_count: i32,
    pub updated_at: NaiveDateTime,
}

impl From<SettlementConfirmationDB> for SettlementConfirmation {
    fn from(db: SettlementConfirmationDB) -> Self {
        Self {
            id: db.id,
            goal_id: db.goal_id,
            member_id: db.member_id,
            created_at: Utc.from_utc_datetime(&db.created_at),
        }
    }
}

impl From<&SettlementConfirmation> for SettlementConfirmationDB {
    fn from(confirmation: &SettlementConfirmation) -> Self {
        Self {
            id: confirmation.id.clone(),
            goal_id: confirmation.goal_id.clone(),
            member_id: confirmation.member_id.clone(),
            created_at: confirmation.created_at.naive_utc(),
        }
    }
}

impl From<CategoryCompletionDB> for CategoryCompletion {
    fn from(db: CategoryCompletionDB) -> Self {
        Self {
            id: db.id,
            group_id: db.group_id,
            user_id: db.user_id,
            category: db.category,
            completion_count: db.completion_count,
            updated_at: Utc.from_utc_datetime(&db.updated_at),
        }
    }
}
