/// Maximum length for group and goal names
pub const NAME_MAX_LEN: usize = 100;

/// Maximum length for a goal category
pub const CATEGORY_MAX_LEN: usize = 50;

/// Maximum length for a goal's unit label
pub const UNIT_MAX_LEN: usize = 20;

/// Maximum length for the reward/punishment description
pub const REWARD_PUNISHMENT_MAX_LEN: usize = 500;

/// Maximum length for the evidence requirement description
pub const EVIDENCE_REQUIREMENT_MAX_LEN: usize = 500;

/// Maximum length for a check-in note
pub const CHECKIN_NOTE_MAX_LEN: usize = 500;

/// Maximum length for a review dispute reason
pub const REVIEW_REASON_MAX_LEN: usize = 500;

/// Evidence files required per check-in
pub const EVIDENCE_MIN_FILES: usize = 1;
pub const EVIDENCE_MAX_FILES: usize = 5;

/// Maximum evidence file size in bytes (5 MB)
pub const EVIDENCE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Accepted evidence file extensions (lowercase)
pub const EVIDENCE_ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "heic"];

/// Voting window for a change request, in hours
pub const CHANGE_REQUEST_WINDOW_HOURS: i64 = 24;

/// Wall-clock days before an unreviewed check-in auto-approves
pub const CHECKIN_AUTO_APPROVE_DAYS: i64 = 3;

/// Iterations for the local-midnight UTC convergence loop
pub const TZ_CONVERGENCE_ITERATIONS: usize = 5;
