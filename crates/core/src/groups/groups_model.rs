//! Group domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pact group: a fixed small membership unit sharing one active goal at a
/// time. The time zone is immutable after creation and is the authority for
/// every "today" calculation for goals in this group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    /// IANA zone identifier, e.g. "Asia/Shanghai".
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
}

/// Input model for creating a new group.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    pub time_zone: String,
}

/// Role of a member within its group, fixed for the membership's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Challenger,
    Supervisor,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Challenger => "CHALLENGER",
            MemberRole::Supervisor => "SUPERVISOR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CHALLENGER" => Some(MemberRole::Challenger),
            "SUPERVISOR" => Some(MemberRole::Supervisor),
            _ => None,
        }
    }
}

/// A user's membership in a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn is_challenger(&self) -> bool {
        self.role == MemberRole::Challenger
    }

    pub fn is_supervisor(&self) -> bool {
        self.role == MemberRole::Supervisor
    }
}
