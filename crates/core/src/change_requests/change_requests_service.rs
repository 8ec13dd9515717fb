use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::change_requests_model::{
    effective_expiry, ChangeRequest, ChangeRequestDetail, ChangeRequestStatus, ChangeRequestType,
    ChangeVote, ProposedChanges, VoteStatus,
};
use super::change_requests_traits::{ChangeRequestRepositoryTrait, ChangeRequestServiceTrait};
use crate::constants::CHANGE_REQUEST_WINDOW_HOURS;
use crate::db::{DbConnection, DbTransactionExecutor};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::goals::{
    apply_time_transition, due_transition, validate_duration_ladder, validate_goal_fields,
    ConfirmationStatus, Goal, GoalConfirmation, GoalRepositoryTrait, GoalStatus, NewGoal,
};
use crate::groups::{Group, GroupRepositoryTrait, Member};
use crate::settlement::SettlementRepositoryTrait;
use crate::utils::time_utils;

enum VoteOutcome {
    Voted(ChangeRequest, Vec<DomainEvent>),
    /// The effective expiry had already passed; the request was marked
    /// EXPIRED and the vote itself fails.
    LazilyExpired(Vec<DomainEvent>),
    /// A due start or end date on the goal was applied first and its
    /// cascade voided the request; the vote itself fails.
    LazilySwept(GoalStatus, Vec<DomainEvent>),
}

enum CreateOutcome {
    Created(ChangeRequest, Vec<DomainEvent>),
    /// A due start or end date was applied first and closed the goal's
    /// open window; the request was never created.
    LazilySwept(GoalStatus, Vec<DomainEvent>),
}

/// Service owning the change-request voting engine.
pub struct ChangeRequestService<E: DbTransactionExecutor + Send + Sync> {
    change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    group_repository: Arc<dyn GroupRepositoryTrait>,
    settlement_repository: Arc<dyn SettlementRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> ChangeRequestService<E> {
    pub fn new(
        change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        group_repository: Arc<dyn GroupRepositoryTrait>,
        settlement_repository: Arc<dyn SettlementRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            change_request_repository,
            goal_repository,
            group_repository,
            settlement_repository,
            event_sink,
            transaction_executor,
        }
    }

    /// Validates a MODIFY proposal against the goal it targets.
    fn validate_modification(
        &self,
        conn: &mut DbConnection,
        goal: &Goal,
        group: &Group,
        members: &[Member],
        changes: &ProposedChanges,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if changes.is_empty() {
            return Err(
                ValidationError::InvalidInput("modification proposes no changes".to_string())
                    .into(),
            );
        }
        if changes.start_date.is_some() && goal.status == GoalStatus::Active {
            return Err(ValidationError::InvalidInput(
                "start date cannot be changed once the goal is running".to_string(),
            )
            .into());
        }

        let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
            Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
        })?;
        // A proposed date that has already arrived (or clock-skewed into the
        // past) is rejected outright rather than creating a request that is
        // expired on arrival.
        for date in [changes.start_date, changes.end_date].into_iter().flatten() {
            if date <= today {
                return Err(ValidationError::InvalidInput(format!(
                    "proposed date {date} must be after today in the group's time zone"
                ))
                .into());
            }
        }

        let merged = changes.apply_to(goal);
        validate_goal_fields(&NewGoal {
            name: merged.name.clone(),
            category: merged.category.clone(),
            target_value: merged.target_value,
            unit: merged.unit.clone(),
            start_date: merged.start_date,
            end_date: merged.end_date,
            reward_punishment: merged.reward_punishment.clone(),
            evidence_requirement: merged.evidence_requirement.clone(),
        })?;

        // The ladder is re-validated against the possibly changed category
        // and dates, exactly as at goal creation.
        validate_duration_ladder(
            conn,
            self.settlement_repository.as_ref(),
            members,
            &goal.group_id,
            &merged.category,
            merged.start_date,
            merged.end_date,
        )
    }

    /// Applies an approved request inside the caller's transaction.
    ///
    /// Event order is load-bearing for the activity feed: the goal's status
    /// change first, then the confirmation reset it triggered, then the
    /// request's own terminal result.
    fn apply_request(
        &self,
        conn: &mut DbConnection,
        request: &ChangeRequest,
        goal: &Goal,
        members: &[Member],
        actor_user_id: &str,
        now: DateTime<Utc>,
        events: &mut Vec<DomainEvent>,
    ) -> Result<ChangeRequest> {
        match request.request_type {
            ChangeRequestType::Cancel => {
                if !self.goal_repository.update_status_if(
                    conn,
                    &goal.id,
                    goal.status,
                    GoalStatus::Cancelled,
                )? {
                    return Err(Error::InvalidState(
                        "goal status changed while the request was being applied".to_string(),
                    ));
                }
                events.push(DomainEvent::GoalStatusChanged {
                    group_id: goal.group_id.clone(),
                    goal_id: goal.id.clone(),
                    goal_name: goal.name.clone(),
                    old_status: goal.status,
                    new_status: GoalStatus::Cancelled,
                    actor_id: Some(actor_user_id.to_string()),
                });
            }
            ChangeRequestType::Modify => {
                let changes = request.proposed_changes.as_ref().ok_or_else(|| {
                    Error::Unexpected("MODIFY request without proposed changes".to_string())
                })?;
                let mut merged = changes.apply_to(goal);
                merged.updated_at = now;
                self.goal_repository.update_goal_fields(conn, &merged)?;

                // A structural change invalidates prior unanimous agreement
                // unless the goal is already running.
                match goal.status {
                    GoalStatus::Active => {}
                    GoalStatus::Upcoming => {
                        if !self.goal_repository.update_status_if(
                            conn,
                            &goal.id,
                            GoalStatus::Upcoming,
                            GoalStatus::Pending,
                        )? {
                            return Err(Error::InvalidState(
                                "goal status changed while the request was being applied"
                                    .to_string(),
                            ));
                        }
                        self.goal_repository.delete_participants(conn, &goal.id)?;
                        events.push(DomainEvent::GoalStatusChanged {
                            group_id: goal.group_id.clone(),
                            goal_id: goal.id.clone(),
                            goal_name: goal.name.clone(),
                            old_status: GoalStatus::Upcoming,
                            new_status: GoalStatus::Pending,
                            actor_id: Some(actor_user_id.to_string()),
                        });
                        self.reset_confirmations(conn, goal, members, now, events)?;
                    }
                    GoalStatus::Pending => {
                        self.reset_confirmations(conn, goal, members, now, events)?;
                    }
                    other => {
                        return Err(Error::InvalidState(format!(
                            "cannot apply a modification to a {} goal",
                            other.as_str()
                        )));
                    }
                }
            }
        }

        if !self.change_request_repository.resolve_request_if_pending(
            conn,
            &request.id,
            ChangeRequestStatus::Approved,
        )? {
            return Err(Error::InvalidState(
                "change request was resolved concurrently".to_string(),
            ));
        }
        events.push(DomainEvent::ChangeRequestResolved {
            group_id: goal.group_id.clone(),
            goal_id: goal.id.clone(),
            request_id: request.id.clone(),
            outcome: ChangeRequestStatus::Approved,
        });

        let mut applied = request.clone();
        applied.status = ChangeRequestStatus::Approved;
        applied.updated_at = now;
        Ok(applied)
    }

    fn reset_confirmations(
        &self,
        conn: &mut DbConnection,
        goal: &Goal,
        members: &[Member],
        now: DateTime<Utc>,
        events: &mut Vec<DomainEvent>,
    ) -> Result<()> {
        self.goal_repository.delete_confirmations(conn, &goal.id)?;
        for member in members {
            self.goal_repository.insert_confirmation(
                conn,
                &GoalConfirmation {
                    id: Uuid::new_v4().to_string(),
                    goal_id: goal.id.clone(),
                    member_id: member.id.clone(),
                    status: ConfirmationStatus::Pending,
                    created_at: now,
                },
            )?;
        }
        events.push(DomainEvent::ConfirmationsReset {
            group_id: goal.group_id.clone(),
            goal_id: goal.id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> ChangeRequestServiceTrait
    for ChangeRequestService<E>
{
    async fn create_change_request(
        &self,
        goal_id: &str,
        user_id: &str,
        request_type: ChangeRequestType,
        proposed_changes: Option<ProposedChanges>,
    ) -> Result<ChangeRequest> {
        let now = Utc::now();

        let outcome = self.transaction_executor.execute(|conn| {
            let mut goal = self.goal_repository.get_goal(conn, goal_id)?;
            let group = self.group_repository.get_group(conn, &goal.group_id)?;
            let members = self.group_repository.list_members(conn, &goal.group_id)?;
            let member = members
                .iter()
                .find(|m| m.user_id == user_id)
                .cloned()
                .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;

            let mut events = Vec::new();

            // Lazy catch-up for scheduler latency: a due start or end date
            // is applied before the request is considered.
            let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            if let Some(next) = due_transition(&goal, today) {
                apply_time_transition(
                    self.goal_repository.as_ref(),
                    self.change_request_repository.as_ref(),
                    conn,
                    &goal,
                    next,
                    &mut events,
                )?;
                if next != GoalStatus::Active {
                    return Ok(CreateOutcome::LazilySwept(next, events));
                }
                goal.status = next;
            }

            if !goal.status.is_open() {
                return Err(Error::InvalidState(format!(
                    "goal is {}; change requests are only valid before settlement",
                    goal.status.as_str()
                )));
            }

            // Lazy sweep: an expired-but-unmarked request does not block a
            // new one.
            if let Some(existing) = self.change_request_repository.find_open_request(conn, goal_id)? {
                if existing.is_expired(now) {
                    if self.change_request_repository.resolve_request_if_pending(
                        conn,
                        &existing.id,
                        ChangeRequestStatus::Expired,
                    )? {
                        events.push(DomainEvent::ChangeRequestResolved {
                            group_id: goal.group_id.clone(),
                            goal_id: goal.id.clone(),
                            request_id: existing.id,
                            outcome: ChangeRequestStatus::Expired,
                        });
                    }
                } else {
                    return Err(Error::InvalidState(
                        "another change request is already open for this goal".to_string(),
                    ));
                }
            }

            match request_type {
                ChangeRequestType::Modify => {
                    let changes = proposed_changes.as_ref().ok_or_else(|| {
                        Error::Validation(ValidationError::MissingField(
                            "proposedChanges".to_string(),
                        ))
                    })?;
                    self.validate_modification(conn, &goal, &group, &members, changes, now)?;
                }
                ChangeRequestType::Cancel => {
                    if proposed_changes.is_some() {
                        return Err(ValidationError::InvalidInput(
                            "a cancellation request must not propose changes".to_string(),
                        )
                        .into());
                    }
                }
            }

            let tz = time_utils::parse_zone(&group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            let expires_at = now + chrono::Duration::hours(CHANGE_REQUEST_WINDOW_HOURS);
            let effective_expires_at = effective_expiry(now, proposed_changes.as_ref(), tz);

            let request = ChangeRequest {
                id: Uuid::new_v4().to_string(),
                goal_id: goal.id.clone(),
                group_id: goal.group_id.clone(),
                request_type,
                status: ChangeRequestStatus::Pending,
                proposed_changes: proposed_changes.clone(),
                created_by: user_id.to_string(),
                expires_at,
                effective_expires_at,
                created_at: now,
                updated_at: now,
            };
            self.change_request_repository.insert_request(conn, &request)?;

            for m in &members {
                let status = if m.id == member.id {
                    VoteStatus::Approved
                } else {
                    VoteStatus::Pending
                };
                self.change_request_repository.insert_vote(
                    conn,
                    &ChangeVote {
                        id: Uuid::new_v4().to_string(),
                        request_id: request.id.clone(),
                        member_id: m.id.clone(),
                        status,
                        created_at: now,
                    },
                )?;
            }

            events.push(DomainEvent::ChangeRequestCreated {
                group_id: goal.group_id.clone(),
                goal_id: goal.id.clone(),
                request_id: request.id.clone(),
                request_type,
                actor_id: user_id.to_string(),
            });

            // The initiator's auto-approval is already unanimous in a
            // single-member group.
            if members.len() == 1 {
                let applied =
                    self.apply_request(conn, &request, &goal, &members, user_id, now, &mut events)?;
                return Ok(CreateOutcome::Created(applied, events));
            }

            Ok(CreateOutcome::Created(request, events))
        })?;

        match outcome {
            CreateOutcome::Created(request, events) => {
                debug!(
                    "Change request {} ({}) opened on goal {}",
                    request.id,
                    request.request_type.as_str(),
                    goal_id
                );
                self.event_sink.emit_batch(events);
                Ok(request)
            }
            CreateOutcome::LazilySwept(status, events) => {
                self.event_sink.emit_batch(events);
                Err(Error::InvalidState(format!(
                    "goal is {}; change requests are only valid before settlement",
                    status.as_str()
                )))
            }
        }
    }

    async fn vote(&self, request_id: &str, user_id: &str, approved: bool) -> Result<ChangeRequest> {
        let now = Utc::now();

        let outcome = self.transaction_executor.execute(|conn| {
            let request = self.change_request_repository.get_request(conn, request_id)?;
            if request.status != ChangeRequestStatus::Pending {
                return Err(Error::InvalidState(format!(
                    "change request is already {}",
                    request.status.as_str()
                )));
            }

            // Lazy expiry: the deadline is authoritative even if the sweep
            // has not marked the row yet.
            if request.is_expired(now) {
                let mut events = Vec::new();
                if self.change_request_repository.resolve_request_if_pending(
                    conn,
                    &request.id,
                    ChangeRequestStatus::Expired,
                )? {
                    events.push(DomainEvent::ChangeRequestResolved {
                        group_id: request.group_id.clone(),
                        goal_id: request.goal_id.clone(),
                        request_id: request.id.clone(),
                        outcome: ChangeRequestStatus::Expired,
                    });
                }
                return Ok(VoteOutcome::LazilyExpired(events));
            }

            let mut goal = self.goal_repository.get_goal(conn, &request.goal_id)?;
            let group = self.group_repository.get_group(conn, &request.group_id)?;
            let members = self.group_repository.list_members(conn, &request.group_id)?;

            // Lazy catch-up for scheduler latency: a due start or end date
            // on the goal is applied before the vote counts. Closing the
            // goal (or activating it under a start-date change) voids the
            // request, so the vote fails instead of deciding a dead window.
            let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            let mut events = Vec::new();
            if let Some(next) = due_transition(&goal, today) {
                apply_time_transition(
                    self.goal_repository.as_ref(),
                    self.change_request_repository.as_ref(),
                    conn,
                    &goal,
                    next,
                    &mut events,
                )?;
                if next != GoalStatus::Active {
                    return Ok(VoteOutcome::LazilySwept(next, events));
                }
                let fresh = self.change_request_repository.get_request(conn, request_id)?;
                if fresh.status != ChangeRequestStatus::Pending {
                    return Ok(VoteOutcome::LazilySwept(next, events));
                }
                goal.status = next;
            }

            let member = members
                .iter()
                .find(|m| m.user_id == user_id)
                .cloned()
                .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;

            let votes = self.change_request_repository.list_votes(conn, request_id)?;
            let mine = votes
                .iter()
                .find(|v| v.member_id == member.id)
                .ok_or_else(|| Error::NotFound("no vote recorded for this member".to_string()))?;
            if mine.status != VoteStatus::Pending {
                return Err(Error::AlreadyActed("vote already cast".to_string()));
            }

            let status = if approved {
                VoteStatus::Approved
            } else {
                VoteStatus::Rejected
            };
            if !self
                .change_request_repository
                .update_vote_if_pending(conn, &mine.id, status)?
            {
                return Err(Error::AlreadyActed("vote already cast".to_string()));
            }

            events.push(DomainEvent::ChangeVoteRecorded {
                group_id: request.group_id.clone(),
                request_id: request.id.clone(),
                actor_id: user_id.to_string(),
                approved,
            });

            if !approved {
                // One dissent resolves the request.
                if !self.change_request_repository.resolve_request_if_pending(
                    conn,
                    &request.id,
                    ChangeRequestStatus::Rejected,
                )? {
                    return Err(Error::InvalidState(
                        "change request was resolved concurrently".to_string(),
                    ));
                }
                events.push(DomainEvent::ChangeRequestResolved {
                    group_id: request.group_id.clone(),
                    goal_id: request.goal_id.clone(),
                    request_id: request.id.clone(),
                    outcome: ChangeRequestStatus::Rejected,
                });
                let mut rejected = request.clone();
                rejected.status = ChangeRequestStatus::Rejected;
                return Ok(VoteOutcome::Voted(rejected, events));
            }

            // Unanimity is evaluated against the live roster: every current
            // member needs an APPROVED vote, so a late joiner's fresh
            // pending row holds the request open.
            let votes = self.change_request_repository.list_votes(conn, request_id)?;
            let unanimous = members.iter().all(|m| {
                votes
                    .iter()
                    .any(|v| v.member_id == m.id && v.status == VoteStatus::Approved)
            });
            if !unanimous {
                return Ok(VoteOutcome::Voted(request, events));
            }

            let applied =
                self.apply_request(conn, &request, &goal, &members, user_id, now, &mut events)?;
            Ok(VoteOutcome::Voted(applied, events))
        })?;

        match outcome {
            VoteOutcome::Voted(request, events) => {
                self.event_sink.emit_batch(events);
                Ok(request)
            }
            VoteOutcome::LazilyExpired(events) => {
                self.event_sink.emit_batch(events);
                Err(Error::InvalidState(
                    "change request has expired".to_string(),
                ))
            }
            VoteOutcome::LazilySwept(status, events) => {
                self.event_sink.emit_batch(events);
                Err(Error::InvalidState(format!(
                    "goal moved to {} before the vote; the request was voided",
                    status.as_str()
                )))
            }
        }
    }

    fn get_change_request(&self, request_id: &str) -> Result<ChangeRequestDetail> {
        self.transaction_executor.execute(|conn| {
            let request = self.change_request_repository.get_request(conn, request_id)?;
            let votes = self.change_request_repository.list_votes(conn, request_id)?;
            Ok(ChangeRequestDetail { request, votes })
        })
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let events = self.transaction_executor.execute(|conn| {
            let mut events = Vec::new();
            for request in self.change_request_repository.list_open_requests(conn)? {
                if request.is_expired(now)
                    && self.change_request_repository.resolve_request_if_pending(
                        conn,
                        &request.id,
                        ChangeRequestStatus::Expired,
                    )?
                {
                    events.push(DomainEvent::ChangeRequestResolved {
                        group_id: request.group_id.clone(),
                        goal_id: request.goal_id.clone(),
                        request_id: request.id.clone(),
                        outcome: ChangeRequestStatus::Expired,
                    });
                }
            }
            Ok(events)
        })?;

        let count = events.len();
        self.event_sink.emit_batch(events);
        Ok(count)
    }

    async fn void_orphaned(&self) -> Result<usize> {
        let events = self.transaction_executor.execute(|conn| {
            let mut events = Vec::new();
            for request in self.change_request_repository.list_open_requests(conn)? {
                let goal = self.goal_repository.get_goal(conn, &request.goal_id)?;
                if !goal.status.is_open()
                    && self.change_request_repository.resolve_request_if_pending(
                        conn,
                        &request.id,
                        ChangeRequestStatus::Voided,
                    )?
                {
                    events.push(DomainEvent::ChangeRequestResolved {
                        group_id: request.group_id.clone(),
                        goal_id: request.goal_id.clone(),
                        request_id: request.id.clone(),
                        outcome: ChangeRequestStatus::Voided,
                    });
                }
            }
            Ok(events)
        })?;

        let count = events.len();
        self.event_sink.emit_batch(events);
        Ok(count)
    }
}
