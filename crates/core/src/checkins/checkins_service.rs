use chrono::{DateTime, Duration, Utc};
use log::{debug, error};
use std::sync::Arc;
use uuid::Uuid;

use super::checkins_model::{
    validate_checkin_input, validate_evidence_upload, Checkin, CheckinEvidence, CheckinReview,
    CheckinStatus, GoalProgress, NewCheckin, ParticipantProgress, ReviewAction,
};
use super::checkins_traits::{CheckinRepositoryTrait, CheckinServiceTrait, EvidenceStoreTrait};
use crate::constants::{CHECKIN_AUTO_APPROVE_DAYS, REVIEW_REASON_MAX_LEN};
use crate::db::{DbConnection, DbTransactionExecutor};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::goals::{Goal, GoalRepositoryTrait, GoalStatus};
use crate::groups::{GroupRepositoryTrait, Member};
use crate::utils::time_utils;

/// Service owning check-in submission and supervisor review.
pub struct CheckinService<E: DbTransactionExecutor + Send + Sync> {
    checkin_repository: Arc<dyn CheckinRepositoryTrait>,
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    group_repository: Arc<dyn GroupRepositoryTrait>,
    evidence_store: Arc<dyn EvidenceStoreTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> CheckinService<E> {
    pub fn new(
        checkin_repository: Arc<dyn CheckinRepositoryTrait>,
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        group_repository: Arc<dyn GroupRepositoryTrait>,
        evidence_store: Arc<dyn EvidenceStoreTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            checkin_repository,
            goal_repository,
            group_repository,
            evidence_store,
            event_sink,
            transaction_executor,
        }
    }

    /// Best-effort cleanup of files stored before a failed transaction.
    fn delete_stored(&self, stored: &[CheckinEvidence]) {
        for file in stored {
            if let Err(e) = self.evidence_store.delete(&file.path) {
                error!("Failed to delete orphaned evidence file {}: {e}", file.path);
            }
        }
    }

    /// Computes per-challenger completion for a goal inside `conn`.
    pub(crate) fn build_progress(
        checkin_repository: &dyn CheckinRepositoryTrait,
        goal_repository: &dyn GoalRepositoryTrait,
        group_repository: &dyn GroupRepositoryTrait,
        conn: &mut DbConnection,
        goal: &Goal,
    ) -> Result<GoalProgress> {
        let participants = goal_repository.list_participants(conn, &goal.id)?;
        let members: Vec<Member> = group_repository.list_members(conn, &goal.group_id)?;
        let checkins = checkin_repository.list_checkins_for_goal(conn, &goal.id)?;

        let mut rows = Vec::with_capacity(participants.len());
        for participant in &participants {
            let completed_value: f64 = checkins
                .iter()
                .filter(|c| {
                    c.member_id == participant.member_id && c.status.counts_toward_completion()
                })
                .map(|c| c.value)
                .sum();
            let percentage = if goal.target_value > 0.0 {
                completed_value / goal.target_value * 100.0
            } else {
                0.0
            };
            let user_id = members
                .iter()
                .find(|m| m.id == participant.member_id)
                .map(|m| m.user_id.clone())
                .ok_or_else(|| {
                    Error::Unexpected(format!(
                        "participant {} has no member row in group {}",
                        participant.member_id, goal.group_id
                    ))
                })?;
            rows.push(ParticipantProgress {
                member_id: participant.member_id.clone(),
                user_id,
                completed_value,
                percentage,
                achieved: completed_value >= goal.target_value,
            });
        }

        Ok(GoalProgress {
            goal_id: goal.id.clone(),
            target_value: goal.target_value,
            participants: rows,
        })
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> CheckinServiceTrait for CheckinService<E> {
    async fn submit_checkin(&self, user_id: &str, new_checkin: NewCheckin) -> Result<Checkin> {
        let now = Utc::now();

        validate_checkin_input(&new_checkin)?;
        for upload in &new_checkin.evidence {
            validate_evidence_upload(upload)?;
        }

        // Evidence bytes are written outside the transaction; the database
        // never sees a check-in whose files are missing. On any later
        // failure the stored files are deleted as compensation.
        let mut stored = Vec::with_capacity(new_checkin.evidence.len());
        for upload in &new_checkin.evidence {
            match self.evidence_store.store(&upload.file_name, &upload.bytes) {
                Ok(file) => stored.push(CheckinEvidence {
                    path: file.path,
                    size_bytes: file.size_bytes,
                }),
                Err(e) => {
                    self.delete_stored(&stored);
                    return Err(e);
                }
            }
        }

        let result = self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, &new_checkin.goal_id)?;
            if goal.status != GoalStatus::Active {
                return Err(Error::InvalidState(format!(
                    "check-ins are only accepted on a running goal, not {}",
                    goal.status.as_str()
                )));
            }

            let group = self.group_repository.get_group(conn, &goal.group_id)?;
            let member = self
                .group_repository
                .find_member(conn, &goal.group_id, user_id)?
                .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;
            if !member.is_challenger() {
                return Err(Error::Forbidden(
                    "only challengers can submit check-ins".to_string(),
                ));
            }
            self.goal_repository
                .find_participant(conn, &goal.id, &member.id)?
                .ok_or_else(|| {
                    Error::Forbidden("not a participant of this goal".to_string())
                })?;

            let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            let latest = goal.end_date.min(today);
            if new_checkin.checkin_date < goal.start_date || new_checkin.checkin_date > latest {
                return Err(ValidationError::InvalidInput(format!(
                    "check-in date must fall between {} and {}",
                    goal.start_date, latest
                ))
                .into());
            }

            let checkin = Checkin {
                id: Uuid::new_v4().to_string(),
                goal_id: goal.id.clone(),
                group_id: goal.group_id.clone(),
                member_id: member.id.clone(),
                checkin_date: new_checkin.checkin_date,
                value: new_checkin.value,
                note: new_checkin.note.clone(),
                evidence: stored.clone(),
                status: CheckinStatus::PendingReview,
                created_at: now,
                updated_at: now,
            };
            self.checkin_repository.insert_checkin(conn, &checkin)?;
            Ok(checkin)
        });

        match result {
            Ok(checkin) => {
                debug!(
                    "Check-in {} submitted on goal {} for {}",
                    checkin.id, checkin.goal_id, checkin.checkin_date
                );
                self.event_sink.emit(DomainEvent::CheckinSubmitted {
                    group_id: checkin.group_id.clone(),
                    goal_id: checkin.goal_id.clone(),
                    checkin_id: checkin.id.clone(),
                    actor_id: user_id.to_string(),
                    value: checkin.value,
                });
                Ok(checkin)
            }
            Err(e) => {
                self.delete_stored(&stored);
                Err(e)
            }
        }
    }

    async fn review_checkin(
        &self,
        checkin_id: &str,
        user_id: &str,
        action: ReviewAction,
        reason: Option<String>,
    ) -> Result<Checkin> {
        let now = Utc::now();

        if action == ReviewAction::Disputed {
            match &reason {
                Some(r) if !r.trim().is_empty() => {
                    if r.len() > REVIEW_REASON_MAX_LEN {
                        return Err(ValidationError::InvalidInput(format!(
                            "dispute reason must be at most {REVIEW_REASON_MAX_LEN} characters"
                        ))
                        .into());
                    }
                }
                _ => {
                    return Err(ValidationError::MissingField("reason".to_string()).into());
                }
            }
        }

        let (checkin, events) = self.transaction_executor.execute(|conn| {
            let mut checkin = self.checkin_repository.get_checkin(conn, checkin_id)?;
            if checkin.status != CheckinStatus::PendingReview {
                return Err(Error::InvalidState(format!(
                    "check-in is already {}",
                    checkin.status.as_str()
                )));
            }

            let goal = self.goal_repository.get_goal(conn, &checkin.goal_id)?;
            // Reviews stay open through settlement so the goal can drain its
            // pending queue.
            if !matches!(goal.status, GoalStatus::Active | GoalStatus::Settling) {
                return Err(Error::InvalidState(format!(
                    "check-ins cannot be reviewed on a {} goal",
                    goal.status.as_str()
                )));
            }

            let members = self.group_repository.list_members(conn, &checkin.group_id)?;
            let member = members
                .iter()
                .find(|m| m.user_id == user_id)
                .cloned()
                .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;
            if !member.is_supervisor() {
                return Err(Error::Forbidden(
                    "only supervisors can review check-ins".to_string(),
                ));
            }

            let reviews = self.checkin_repository.list_reviews(conn, checkin_id)?;
            if reviews.iter().any(|r| r.member_id == member.id) {
                return Err(Error::AlreadyActed(
                    "this check-in has already been reviewed by you".to_string(),
                ));
            }

            let review = CheckinReview {
                id: Uuid::new_v4().to_string(),
                checkin_id: checkin.id.clone(),
                member_id: member.id.clone(),
                action,
                reason: reason.clone(),
                created_at: now,
            };
            self.checkin_repository
                .insert_review(conn, &review)
                .map_err(|e| {
                    e.map_unique_violation("this check-in has already been reviewed by you")
                })?;

            let mut events = vec![DomainEvent::CheckinReviewed {
                group_id: checkin.group_id.clone(),
                checkin_id: checkin.id.clone(),
                actor_id: user_id.to_string(),
                confirmed: action == ReviewAction::Confirmed,
            }];

            match action {
                ReviewAction::Disputed => {
                    // A single dispute is final.
                    if !self.checkin_repository.update_status_if(
                        conn,
                        &checkin.id,
                        CheckinStatus::PendingReview,
                        CheckinStatus::Disputed,
                    )? {
                        return Err(Error::InvalidState(
                            "check-in status changed concurrently".to_string(),
                        ));
                    }
                    events.push(DomainEvent::CheckinStatusChanged {
                        group_id: checkin.group_id.clone(),
                        checkin_id: checkin.id.clone(),
                        old_status: CheckinStatus::PendingReview,
                        new_status: CheckinStatus::Disputed,
                    });
                    checkin.status = CheckinStatus::Disputed;
                }
                ReviewAction::Confirmed => {
                    // Confirmation needs every live supervisor, so the bar
                    // rises when a supervisor joins mid-review.
                    let supervisor_count =
                        members.iter().filter(|m| m.is_supervisor()).count();
                    let confirmed_count = self
                        .checkin_repository
                        .list_reviews(conn, checkin_id)?
                        .iter()
                        .filter(|r| r.action == ReviewAction::Confirmed)
                        .count();
                    if confirmed_count >= supervisor_count {
                        if !self.checkin_repository.update_status_if(
                            conn,
                            &checkin.id,
                            CheckinStatus::PendingReview,
                            CheckinStatus::Confirmed,
                        )? {
                            return Err(Error::InvalidState(
                                "check-in status changed concurrently".to_string(),
                            ));
                        }
                        events.push(DomainEvent::CheckinStatusChanged {
                            group_id: checkin.group_id.clone(),
                            checkin_id: checkin.id.clone(),
                            old_status: CheckinStatus::PendingReview,
                            new_status: CheckinStatus::Confirmed,
                        });
                        checkin.status = CheckinStatus::Confirmed;
                    }
                }
            }

            checkin.updated_at = now;
            Ok((checkin, events))
        })?;

        self.event_sink.emit_batch(events);
        Ok(checkin)
    }

    fn get_progress(&self, goal_id: &str) -> Result<GoalProgress> {
        self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            Self::build_progress(
                self.checkin_repository.as_ref(),
                self.goal_repository.as_ref(),
                self.group_repository.as_ref(),
                conn,
                &goal,
            )
        })
    }

    async fn auto_approve_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(CHECKIN_AUTO_APPROVE_DAYS);

        let events = self.transaction_executor.execute(|conn| {
            let mut events = Vec::new();
            for checkin in self.checkin_repository.list_stale_pending(conn, cutoff)? {
                if self.checkin_repository.update_status_if(
                    conn,
                    &checkin.id,
                    CheckinStatus::PendingReview,
                    CheckinStatus::AutoApproved,
                )? {
                    events.push(DomainEvent::CheckinStatusChanged {
                        group_id: checkin.group_id.clone(),
                        checkin_id: checkin.id.clone(),
                        old_status: CheckinStatus::PendingReview,
                        new_status: CheckinStatus::AutoApproved,
                    });
                }
            }
            Ok(events)
        })?;

        let count = events.len();
        if count > 0 {
            debug!("Auto-approved {count} check-ins pending past the review window");
        }
        self.event_sink.emit_batch(events);
        Ok(count)
    }
}
