//! Check-ins module - submission, supervisor review, auto-approval.

mod checkins_model;
mod checkins_service;
mod checkins_traits;

#[cfg(test)]
mod checkins_service_tests;

pub use checkins_model::{
    validate_checkin_input, validate_evidence_upload, Checkin, CheckinEvidence, CheckinReview,
    CheckinStatus, EvidenceUpload, GoalProgress, NewCheckin, ParticipantProgress, ReviewAction,
    StoredEvidence,
};
pub use checkins_service::CheckinService;
pub use checkins_traits::{CheckinRepositoryTrait, CheckinServiceTrait, EvidenceStoreTrait};
