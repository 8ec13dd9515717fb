//! Check-in domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CHECKIN_NOTE_MAX_LEN, EVIDENCE_ALLOWED_EXTENSIONS, EVIDENCE_MAX_BYTES, EVIDENCE_MAX_FILES,
    EVIDENCE_MIN_FILES,
};
use crate::errors::{Result, ValidationError};

/// Review status of a check-in.
///
/// CONFIRMED and AUTO_APPROVED count toward the completed value; DISPUTED
/// and PENDING_REVIEW do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckinStatus {
    PendingReview,
    Confirmed,
    Disputed,
    AutoApproved,
}

impl CheckinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinStatus::PendingReview => "PENDING_REVIEW",
            CheckinStatus::Confirmed => "CONFIRMED",
            CheckinStatus::Disputed => "DISPUTED",
            CheckinStatus::AutoApproved => "AUTO_APPROVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING_REVIEW" => Some(CheckinStatus::PendingReview),
            "CONFIRMED" => Some(CheckinStatus::Confirmed),
            "DISPUTED" => Some(CheckinStatus::Disputed),
            "AUTO_APPROVED" => Some(CheckinStatus::AutoApproved),
            _ => None,
        }
    }

    /// Whether this check-in's value counts toward the completed total.
    pub fn counts_toward_completion(&self) -> bool {
        matches!(self, CheckinStatus::Confirmed | CheckinStatus::AutoApproved)
    }
}

/// A supervisor's verdict on a single check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    Confirmed,
    Disputed,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Confirmed => "CONFIRMED",
            ReviewAction::Disputed => "DISPUTED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(ReviewAction::Confirmed),
            "DISPUTED" => Some(ReviewAction::Disputed),
            _ => None,
        }
    }
}

/// A stored evidence file reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckinEvidence {
    pub path: String,
    pub size_bytes: i64,
}

/// Result of handing raw bytes to the evidence store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvidence {
    pub path: String,
    pub size_bytes: i64,
}

/// Raw evidence file attached to a submission, before storage.
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A dated, evidenced progress submission by a challenger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: String,
    pub goal_id: String,
    pub group_id: String,
    pub member_id: String,
    pub checkin_date: NaiveDate,
    pub value: f64,
    pub note: Option<String>,
    pub evidence: Vec<CheckinEvidence>,
    pub status: CheckinStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for submitting a check-in.
#[derive(Debug, Clone)]
pub struct NewCheckin {
    pub goal_id: String,
    pub checkin_date: NaiveDate,
    pub value: f64,
    pub note: Option<String>,
    pub evidence: Vec<EvidenceUpload>,
}

/// One review per (check-in, supervisor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReview {
    pub id: String,
    pub checkin_id: String,
    pub member_id: String,
    pub action: ReviewAction,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One challenger's completion state within a goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProgress {
    pub member_id: String,
    pub user_id: String,
    pub completed_value: f64,
    pub percentage: f64,
    pub achieved: bool,
}

/// Read projection: per-challenger progress toward the goal target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub target_value: f64,
    pub participants: Vec<ParticipantProgress>,
}

/// Validates the note and value bounds of a submission.
pub fn validate_checkin_input(new_checkin: &NewCheckin) -> Result<()> {
    if !new_checkin.value.is_finite() || new_checkin.value <= 0.0 {
        return Err(
            ValidationError::InvalidInput("check-in value must be positive".to_string()).into(),
        );
    }
    if let Some(note) = &new_checkin.note {
        if note.len() > CHECKIN_NOTE_MAX_LEN {
            return Err(ValidationError::InvalidInput(format!(
                "note must be at most {CHECKIN_NOTE_MAX_LEN} characters"
            ))
            .into());
        }
    }
    let count = new_checkin.evidence.len();
    if !(EVIDENCE_MIN_FILES..=EVIDENCE_MAX_FILES).contains(&count) {
        return Err(ValidationError::InvalidInput(format!(
            "check-in requires {EVIDENCE_MIN_FILES}-{EVIDENCE_MAX_FILES} evidence files, got {count}"
        ))
        .into());
    }
    Ok(())
}

/// Validates a single evidence file (extension allow-list, size cap).
pub fn validate_evidence_upload(upload: &EvidenceUpload) -> Result<()> {
    let extension = upload
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if EVIDENCE_ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(ValidationError::InvalidInput(format!(
                "unsupported evidence file type: {}",
                upload.file_name
            ))
            .into())
        }
    }
    if upload.bytes.len() > EVIDENCE_MAX_BYTES {
        return Err(ValidationError::InvalidInput(format!(
            "evidence file {} exceeds the 5 MB limit",
            upload.file_name
        ))
        .into());
    }
    Ok(())
}
