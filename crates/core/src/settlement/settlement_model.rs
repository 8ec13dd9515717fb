//! Settlement domain models and the duration ladder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goals::GoalStatus;

/// A supervisor's sign-off on a settling goal. One per (goal, supervisor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementConfirmation {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub created_at: DateTime<Utc>,
}

/// Completion streak per (group, user, category). The count only ever
/// increases and drives the duration ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCompletion {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub category: String,
    pub completion_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// Months a future goal of a category may span, given the challenger's
/// completion count in that category. Monotone non-decreasing.
pub fn duration_ladder_months(completion_count: i32) -> u32 {
    match completion_count {
        i32::MIN..=0 => 1,
        1 => 2,
        2..=3 => 3,
        4..=5 => 6,
        _ => 12,
    }
}

/// One challenger's outcome in a settled goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchieverResult {
    pub member_id: String,
    pub user_id: String,
    pub completed_value: f64,
    pub percentage: f64,
    pub achieved: bool,
    /// Months unlocked by the completion that archival recorded, when the
    /// ladder tier rose. Only populated for achieved challengers on an
    /// archived goal.
    pub unlocked_months: Option<u32>,
}

/// Read projection for a SETTLING or ARCHIVED goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub goal_id: String,
    pub status: GoalStatus,
    pub target_value: f64,
    pub confirmations: Vec<SettlementConfirmation>,
    pub results: Vec<AchieverResult>,
}
