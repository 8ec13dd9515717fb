//! Goal domain models and the pure lifecycle rules.
//!
//! The time-based transition rules live here as pure functions of "today" so
//! the same logic backs both the lazy inline checks on write paths and the
//! scheduler sweep. Duplicating the rules was the bug class this design
//! replaces.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CATEGORY_MAX_LEN, EVIDENCE_REQUIREMENT_MAX_LEN, NAME_MAX_LEN, REWARD_PUNISHMENT_MAX_LEN,
    UNIT_MAX_LEN,
};
use crate::errors::{Result, ValidationError};

/// Lifecycle status of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Pending,
    Upcoming,
    Active,
    Settling,
    Archived,
    Voided,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Upcoming => "UPCOMING",
            GoalStatus::Active => "ACTIVE",
            GoalStatus::Settling => "SETTLING",
            GoalStatus::Archived => "ARCHIVED",
            GoalStatus::Voided => "VOIDED",
            GoalStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(GoalStatus::Pending),
            "UPCOMING" => Some(GoalStatus::Upcoming),
            "ACTIVE" => Some(GoalStatus::Active),
            "SETTLING" => Some(GoalStatus::Settling),
            "ARCHIVED" => Some(GoalStatus::Archived),
            "VOIDED" => Some(GoalStatus::Voided),
            "CANCELLED" => Some(GoalStatus::Cancelled),
            _ => None,
        }
    }

    /// Statuses that count against the one-open-goal-per-group invariant.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            GoalStatus::Pending | GoalStatus::Upcoming | GoalStatus::Active
        )
    }

    pub const OPEN: [GoalStatus; 3] = [GoalStatus::Pending, GoalStatus::Upcoming, GoalStatus::Active];
}

/// A time-boxed, quantified commitment with a lifecycle from proposal to
/// archival. Start and end dates are inclusive calendar dates in the group's
/// time zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub category: String,
    pub target_value: f64,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reward_punishment: String,
    pub evidence_requirement: String,
    pub status: GoalStatus,
    /// User id of the creating member.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a new goal.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub name: String,
    pub category: String,
    pub target_value: f64,
    pub unit: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reward_punishment: String,
    pub evidence_requirement: String,
}

/// Per-member confirmation status of a pending goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "PENDING",
            ConfirmationStatus::Approved => "APPROVED",
            ConfirmationStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ConfirmationStatus::Pending),
            "APPROVED" => Some(ConfirmationStatus::Approved),
            "REJECTED" => Some(ConfirmationStatus::Rejected),
            _ => None,
        }
    }
}

/// One row per (goal, member); recreated whenever a change request resets
/// confirmations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalConfirmation {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub status: ConfirmationStatus,
    pub created_at: DateTime<Utc>,
}

/// Enrollment of a challenger member in a goal's check-ins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalParticipant {
    pub id: String,
    pub goal_id: String,
    pub member_id: String,
    pub created_at: DateTime<Utc>,
}

/// Read projection: a goal with its confirmations and participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDetail {
    pub goal: Goal,
    pub confirmations: Vec<GoalConfirmation>,
    pub participants: Vec<GoalParticipant>,
}

/// Duration of the inclusive [start, end] span in whole months, rounding up
/// a partial month when the end day-of-month has reached the start's.
pub fn duration_months(start: NaiveDate, end: NaiveDate) -> u32 {
    use chrono::Datelike;

    let whole =
        (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
    let rounded = if end.day() >= start.day() { whole + 1 } else { whole };
    rounded.max(0) as u32
}

/// The time-driven transition a goal is due for as of `today` in its group's
/// zone, if any. Pure; called from both the scheduler sweep and the lazy
/// inline checks.
pub fn due_transition(goal: &Goal, today: NaiveDate) -> Option<GoalStatus> {
    match goal.status {
        // Members failed to unanimously confirm before the start arrived.
        GoalStatus::Pending if today >= goal.start_date => Some(GoalStatus::Voided),
        GoalStatus::Upcoming if today >= goal.start_date => Some(GoalStatus::Active),
        GoalStatus::Active if today > goal.end_date => Some(GoalStatus::Settling),
        _ => None,
    }
}

/// Validates the scalar fields of a goal (lengths, positivity). Date rules
/// need the group zone and are checked in the service.
pub fn validate_goal_fields(new_goal: &NewGoal) -> Result<()> {
    if new_goal.name.trim().is_empty() || new_goal.name.len() > NAME_MAX_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "goal name must be 1-{NAME_MAX_LEN} characters"
        ))
        .into());
    }
    if new_goal.category.trim().is_empty() || new_goal.category.len() > CATEGORY_MAX_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "category must be 1-{CATEGORY_MAX_LEN} characters"
        ))
        .into());
    }
    if new_goal.unit.trim().is_empty() || new_goal.unit.len() > UNIT_MAX_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "unit must be 1-{UNIT_MAX_LEN} characters"
        ))
        .into());
    }
    if !new_goal.target_value.is_finite() || new_goal.target_value <= 0.0 {
        return Err(
            ValidationError::InvalidInput("target value must be positive".to_string()).into(),
        );
    }
    if new_goal.reward_punishment.len() > REWARD_PUNISHMENT_MAX_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "reward/punishment must be at most {REWARD_PUNISHMENT_MAX_LEN} characters"
        ))
        .into());
    }
    if new_goal.evidence_requirement.len() > EVIDENCE_REQUIREMENT_MAX_LEN {
        return Err(ValidationError::InvalidInput(format!(
            "evidence requirement must be at most {EVIDENCE_REQUIREMENT_MAX_LEN} characters"
        ))
        .into());
    }
    if new_goal.end_date < new_goal.start_date {
        return Err(
            ValidationError::InvalidInput("end date must not precede start date".to_string())
                .into(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal_with(status: GoalStatus, start: NaiveDate, end: NaiveDate) -> Goal {
        Goal {
            id: "goal1".to_string(),
            group_id: "grp1".to_string(),
            name: "Run 100km".to_string(),
            category: "fitness".to_string(),
            target_value: 100.0,
            unit: "km".to_string(),
            start_date: start,
            end_date: end,
            reward_punishment: String::new(),
            evidence_requirement: String::new(),
            status,
            created_by: "u1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_duration_months_partial_rounds_by_day() {
        // Jan 15 - Feb 14: the partial month has not completed.
        assert_eq!(duration_months(date(2026, 1, 15), date(2026, 2, 14)), 1);
        // Jan 15 - Feb 15: day reached, rounds up.
        assert_eq!(duration_months(date(2026, 1, 15), date(2026, 2, 15)), 2);
        // Within one month.
        assert_eq!(duration_months(date(2026, 1, 1), date(2026, 1, 31)), 1);
        // Across a year boundary.
        assert_eq!(duration_months(date(2026, 11, 10), date(2027, 2, 9)), 3);
    }

    #[test]
    fn test_due_transition_pending_voids_at_start() {
        let goal = goal_with(GoalStatus::Pending, date(2026, 2, 10), date(2026, 3, 10));
        assert_eq!(due_transition(&goal, date(2026, 2, 9)), None);
        assert_eq!(
            due_transition(&goal, date(2026, 2, 10)),
            Some(GoalStatus::Voided)
        );
    }

    #[test]
    fn test_due_transition_upcoming_activates_at_start() {
        let goal = goal_with(GoalStatus::Upcoming, date(2026, 2, 10), date(2026, 3, 10));
        assert_eq!(due_transition(&goal, date(2026, 2, 9)), None);
        assert_eq!(
            due_transition(&goal, date(2026, 2, 10)),
            Some(GoalStatus::Active)
        );
    }

    #[test]
    fn test_due_transition_active_settles_after_end() {
        let goal = goal_with(GoalStatus::Active, date(2026, 2, 10), date(2026, 3, 10));
        // End date itself is still in-range (inclusive).
        assert_eq!(due_transition(&goal, date(2026, 3, 10)), None);
        assert_eq!(
            due_transition(&goal, date(2026, 3, 11)),
            Some(GoalStatus::Settling)
        );
    }

    #[test]
    fn test_due_transition_terminal_states_stay_put() {
        for status in [
            GoalStatus::Settling,
            GoalStatus::Archived,
            GoalStatus::Voided,
            GoalStatus::Cancelled,
        ] {
            let goal = goal_with(status, date(2026, 2, 10), date(2026, 3, 10));
            assert_eq!(due_transition(&goal, date(2026, 4, 1)), None);
        }
    }

    #[test]
    fn test_validate_goal_fields_bounds() {
        let valid = NewGoal {
            name: "Read books".to_string(),
            category: "reading".to_string(),
            target_value: 12.0,
            unit: "books".to_string(),
            start_date: date(2026, 3, 1),
            end_date: date(2026, 3, 31),
            reward_punishment: "loser buys dinner".to_string(),
            evidence_requirement: "photo of the book".to_string(),
        };
        assert!(validate_goal_fields(&valid).is_ok());

        let mut bad = valid.clone();
        bad.target_value = 0.0;
        assert!(validate_goal_fields(&bad).is_err());

        let mut bad = valid.clone();
        bad.name = String::new();
        assert!(validate_goal_fields(&bad).is_err());

        let mut bad = valid.clone();
        bad.end_date = date(2026, 2, 1);
        assert!(validate_goal_fields(&bad).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            GoalStatus::Pending,
            GoalStatus::Upcoming,
            GoalStatus::Active,
            GoalStatus::Settling,
            GoalStatus::Archived,
            GoalStatus::Voided,
            GoalStatus::Cancelled,
        ] {
            assert_eq!(GoalStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(GoalStatus::from_str("DRAFT"), None);
    }
}
