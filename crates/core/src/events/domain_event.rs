//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::change_requests::{ChangeRequestStatus, ChangeRequestType};
use crate::checkins::CheckinStatus;
use crate::goals::GoalStatus;

/// Domain events emitted by core services after successful mutations.
///
/// One event is appended per state transition or recorded action, in cascade
/// order: a goal's status change precedes the confirmation reset it caused,
/// which precedes the change request's own terminal result. The activity
/// feed consuming these relies on that per-group ordering.
///
/// `actor_id` is the acting member, or `None` for scheduler-originated
/// transitions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    MemberJoined {
        group_id: String,
        member_id: String,
        role: String,
    },

    GoalCreated {
        group_id: String,
        goal_id: String,
        goal_name: String,
        actor_id: String,
    },

    GoalStatusChanged {
        group_id: String,
        goal_id: String,
        goal_name: String,
        old_status: GoalStatus,
        new_status: GoalStatus,
        actor_id: Option<String>,
    },

    GoalConfirmationRecorded {
        group_id: String,
        goal_id: String,
        actor_id: String,
        approved: bool,
    },

    /// All confirmations were wiped and recreated as pending after an
    /// applied MODIFY change request.
    ConfirmationsReset {
        group_id: String,
        goal_id: String,
    },

    ChangeRequestCreated {
        group_id: String,
        goal_id: String,
        request_id: String,
        request_type: ChangeRequestType,
        actor_id: String,
    },

    ChangeVoteRecorded {
        group_id: String,
        request_id: String,
        actor_id: String,
        approved: bool,
    },

    ChangeRequestResolved {
        group_id: String,
        goal_id: String,
        request_id: String,
        outcome: ChangeRequestStatus,
    },

    CheckinSubmitted {
        group_id: String,
        goal_id: String,
        checkin_id: String,
        actor_id: String,
        value: f64,
    },

    CheckinReviewed {
        group_id: String,
        checkin_id: String,
        actor_id: String,
        confirmed: bool,
    },

    CheckinStatusChanged {
        group_id: String,
        checkin_id: String,
        old_status: CheckinStatus,
        new_status: CheckinStatus,
    },

    SettlementConfirmed {
        group_id: String,
        goal_id: String,
        actor_id: String,
    },

    GoalArchived {
        group_id: String,
        goal_id: String,
        goal_name: String,
    },

    /// A challenger's category completion count crossed a ladder threshold,
    /// unlocking a longer allowed goal duration.
    TierUnlocked {
        group_id: String,
        user_id: String,
        category: String,
        completion_count: i32,
        allowed_months: u32,
    },
}

impl DomainEvent {
    /// Group the event belongs to, for per-group feed ordering.
    pub fn group_id(&self) -> &str {
        match self {
            DomainEvent::MemberJoined { group_id, .. }
            | DomainEvent::GoalCreated { group_id, .. }
            | DomainEvent::GoalStatusChanged { group_id, .. }
            | DomainEvent::GoalConfirmationRecorded { group_id, .. }
            | DomainEvent::ConfirmationsReset { group_id, .. }
            | DomainEvent::ChangeRequestCreated { group_id, .. }
            | DomainEvent::ChangeVoteRecorded { group_id, .. }
            | DomainEvent::ChangeRequestResolved { group_id, .. }
            | DomainEvent::CheckinSubmitted { group_id, .. }
            | DomainEvent::CheckinReviewed { group_id, .. }
            | DomainEvent::CheckinStatusChanged { group_id, .. }
            | DomainEvent::SettlementConfirmed { group_id, .. }
            | DomainEvent::GoalArchived { group_id, .. }
            | DomainEvent::TierUnlocked { group_id, .. } => group_id,
        }
    }

    /// Acting member, when the event was member-initiated.
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            DomainEvent::GoalCreated { actor_id, .. }
            | DomainEvent::GoalConfirmationRecorded { actor_id, .. }
            | DomainEvent::ChangeRequestCreated { actor_id, .. }
            | DomainEvent::ChangeVoteRecorded { actor_id, .. }
            | DomainEvent::CheckinSubmitted { actor_id, .. }
            | DomainEvent::CheckinReviewed { actor_id, .. }
            | DomainEvent::SettlementConfirmed { actor_id, .. } => Some(actor_id),
            DomainEvent::GoalStatusChanged { actor_id, .. } => actor_id.as_deref(),
            _ => None,
        }
    }
}
