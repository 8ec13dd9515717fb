//! Change request domain models and expiry math.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::CHANGE_REQUEST_WINDOW_HOURS;
use crate::goals::Goal;
use crate::utils::time_utils::local_midnight_utc_tz;

/// Kind of change being proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestType {
    Modify,
    Cancel,
}

impl ChangeRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestType::Modify => "MODIFY",
            ChangeRequestType::Cancel => "CANCEL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MODIFY" => Some(ChangeRequestType::Modify),
            "CANCEL" => Some(ChangeRequestType::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Voided,
}

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "PENDING",
            ChangeRequestStatus::Approved => "APPROVED",
            ChangeRequestStatus::Rejected => "REJECTED",
            ChangeRequestStatus::Expired => "EXPIRED",
            ChangeRequestStatus::Voided => "VOIDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ChangeRequestStatus::Pending),
            "APPROVED" => Some(ChangeRequestStatus::Approved),
            "REJECTED" => Some(ChangeRequestStatus::Rejected),
            "EXPIRED" => Some(ChangeRequestStatus::Expired),
            "VOIDED" => Some(ChangeRequestStatus::Voided),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteStatus {
    Pending,
    Approved,
    Rejected,
}

impl VoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteStatus::Pending => "PENDING",
            VoteStatus::Approved => "APPROVED",
            VoteStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(VoteStatus::Pending),
            "APPROVED" => Some(VoteStatus::Approved),
            "REJECTED" => Some(VoteStatus::Rejected),
            _ => None,
        }
    }
}

/// The partial field set a MODIFY request proposes. `None` fields are left
/// untouched on apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub reward_punishment: Option<String>,
    pub evidence_requirement: Option<String>,
}

impl ProposedChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.target_value.is_none()
            && self.unit.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.reward_punishment.is_none()
            && self.evidence_requirement.is_none()
    }

    /// The goal as it would look with these changes applied.
    pub fn apply_to(&self, goal: &Goal) -> Goal {
        let mut updated = goal.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(category) = &self.category {
            updated.category = category.clone();
        }
        if let Some(target_value) = self.target_value {
            updated.target_value = target_value;
        }
        if let Some(unit) = &self.unit {
            updated.unit = unit.clone();
        }
        if let Some(start_date) = self.start_date {
            updated.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            updated.end_date = end_date;
        }
        if let Some(reward_punishment) = &self.reward_punishment {
            updated.reward_punishment = reward_punishment.clone();
        }
        if let Some(evidence_requirement) = &self.evidence_requirement {
            updated.evidence_requirement = evidence_requirement.clone();
        }
        updated
    }
}

/// A unanimous-consent proposal against a goal. At most one non-terminal
/// request exists per goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: String,
    pub goal_id: String,
    pub group_id: String,
    pub request_type: ChangeRequestType,
    pub status: ChangeRequestStatus,
    /// Only present for MODIFY.
    pub proposed_changes: Option<ProposedChanges>,
    /// User id of the initiating member (auto-approved).
    pub created_by: String,
    /// The fixed 24-hour voting deadline.
    pub expires_at: DateTime<Utc>,
    /// min(expires_at, group-local midnight of any proposed date): a change
    /// proposing an imminent date must resolve before that date arrives.
    pub effective_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChangeRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.effective_expires_at
    }
}

/// One vote per (request, member); immutable once cast. A row is created for
/// every member at request creation, and for any member who joins while the
/// request is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeVote {
    pub id: String,
    pub request_id: String,
    pub member_id: String,
    pub status: VoteStatus,
    pub created_at: DateTime<Utc>,
}

/// Read projection: a request with its votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestDetail {
    pub request: ChangeRequest,
    pub votes: Vec<ChangeVote>,
}

/// Voting deadline for a request created at `created_at` proposing `changes`
/// in a group running on `tz`: the 24-hour window, shortened to the
/// group-local midnight of any proposed start/end date.
pub fn effective_expiry(
    created_at: DateTime<Utc>,
    changes: Option<&ProposedChanges>,
    tz: Tz,
) -> DateTime<Utc> {
    let mut expiry = created_at + Duration::hours(CHANGE_REQUEST_WINDOW_HOURS);

    if let Some(changes) = changes {
        for date in [changes.start_date, changes.end_date].into_iter().flatten() {
            let midnight = local_midnight_utc_tz(date, tz);
            if midnight < expiry {
                expiry = midnight;
            }
        }
    }

    expiry
}
