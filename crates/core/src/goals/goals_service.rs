use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::goals_model::{
    due_transition, duration_months, validate_goal_fields, ConfirmationStatus, Goal,
    GoalConfirmation, GoalDetail, GoalParticipant, GoalStatus, NewGoal,
};
use super::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::change_requests::{ChangeRequestRepositoryTrait, ChangeRequestStatus, ChangeRequestType};
use crate::db::{DbConnection, DbTransactionExecutor};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::groups::{Group, GroupRepositoryTrait, Member};
use crate::settlement::{duration_ladder_months, SettlementRepositoryTrait};
use crate::utils::time_utils;

/// Checks the requested [start, end] span against the duration ladder: the
/// computed whole-month duration must not exceed the minimum allowance over
/// the group's current challengers for this category.
pub(crate) fn validate_duration_ladder(
    conn: &mut DbConnection,
    settlement_repository: &dyn SettlementRepositoryTrait,
    members: &[Member],
    group_id: &str,
    category: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<()> {
    let duration = duration_months(start_date, end_date);
    let mut min_allowed: Option<u32> = None;
    for member in members.iter().filter(|m| m.is_challenger()) {
        let count = settlement_repository
            .find_category_completion(conn, group_id, &member.user_id, category)?
            .map(|c| c.completion_count)
            .unwrap_or(0);
        let allowed = duration_ladder_months(count);
        min_allowed = Some(min_allowed.map_or(allowed, |current| current.min(allowed)));
    }
    if let Some(allowed) = min_allowed {
        if duration > allowed {
            return Err(ValidationError::InvalidInput(format!(
                "goal duration of {duration} month(s) exceeds the {allowed}-month allowance for category '{category}'"
            ))
            .into());
        }
    }
    Ok(())
}

/// Applies one time-driven goal transition with its change-request cascade.
///
/// The status write is a compare-and-swap against the status `goal` was
/// loaded with, so a concurrent sweep or lazy inline check performs the
/// transition exactly once; the loser observes `false` and emits nothing.
pub(crate) fn apply_time_transition(
    goal_repository: &dyn GoalRepositoryTrait,
    change_request_repository: &dyn ChangeRequestRepositoryTrait,
    conn: &mut DbConnection,
    goal: &Goal,
    new_status: GoalStatus,
    events: &mut Vec<DomainEvent>,
) -> Result<bool> {
    if !goal_repository.update_status_if(conn, &goal.id, goal.status, new_status)? {
        return Ok(false);
    }
    events.push(DomainEvent::GoalStatusChanged {
        group_id: goal.group_id.clone(),
        goal_id: goal.id.clone(),
        goal_name: goal.name.clone(),
        old_status: goal.status,
        new_status,
        actor_id: None,
    });

    match new_status {
        // A goal that has started can no longer move its start date; a
        // MODIFY proposing one has lost its meaning.
        GoalStatus::Active => {
            if let Some(request) = change_request_repository.find_open_request(conn, &goal.id)? {
                let proposes_start = request.request_type == ChangeRequestType::Modify
                    && request
                        .proposed_changes
                        .as_ref()
                        .is_some_and(|c| c.start_date.is_some());
                if proposes_start {
                    void_open_request(change_request_repository, conn, goal, events)?;
                }
            }
        }
        GoalStatus::Voided | GoalStatus::Settling | GoalStatus::Cancelled => {
            void_open_request(change_request_repository, conn, goal, events)?;
        }
        _ => {}
    }

    Ok(true)
}

/// Voids the goal's open change request, if any, recording the terminal
/// event after the goal's own status event (feed ordering).
pub(crate) fn void_open_request(
    change_request_repository: &dyn ChangeRequestRepositoryTrait,
    conn: &mut DbConnection,
    goal: &Goal,
    events: &mut Vec<DomainEvent>,
) -> Result<()> {
    if let Some(request) = change_request_repository.find_open_request(conn, &goal.id)? {
        if change_request_repository.resolve_request_if_pending(
            conn,
            &request.id,
            ChangeRequestStatus::Voided,
        )? {
            events.push(DomainEvent::ChangeRequestResolved {
                group_id: goal.group_id.clone(),
                goal_id: goal.id.clone(),
                request_id: request.id,
                outcome: ChangeRequestStatus::Voided,
            });
        }
    }
    Ok(())
}

enum ConfirmOutcome {
    Recorded(Goal, Vec<DomainEvent>),
    /// The start date had already arrived; the goal was voided as a side
    /// effect and the confirmation itself fails.
    LazilyVoided(Vec<DomainEvent>),
}

/// Service owning the goal lifecycle state machine.
pub struct GoalService<E: DbTransactionExecutor + Send + Sync> {
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    group_repository: Arc<dyn GroupRepositoryTrait>,
    change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
    settlement_repository: Arc<dyn SettlementRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> GoalService<E> {
    pub fn new(
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        group_repository: Arc<dyn GroupRepositoryTrait>,
        change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
        settlement_repository: Arc<dyn SettlementRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            goal_repository,
            group_repository,
            change_request_repository,
            settlement_repository,
            event_sink,
            transaction_executor,
        }
    }

    fn load_group_and_member(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
    ) -> Result<(Group, Vec<Member>, Member)> {
        let group = self.group_repository.get_group(conn, group_id)?;
        let members = self.group_repository.list_members(conn, group_id)?;
        let member = members
            .iter()
            .find(|m| m.user_id == user_id)
            .cloned()
            .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;
        Ok((group, members, member))
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> GoalServiceTrait for GoalService<E> {
    async fn create_goal(&self, group_id: &str, user_id: &str, new_goal: NewGoal) -> Result<Goal> {
        validate_goal_fields(&new_goal)?;
        let now = Utc::now();

        let (goal, events) = self.transaction_executor.execute(|conn| {
            let (group, members, member) = self.load_group_and_member(conn, group_id, user_id)?;

            let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            if new_goal.start_date <= today {
                return Err(ValidationError::InvalidInput(
                    "start date must be after today in the group's time zone".to_string(),
                )
                .into());
            }

            if self.goal_repository.find_open_goal(conn, group_id)?.is_some() {
                return Err(Error::InvalidState(
                    "group already has an open goal".to_string(),
                ));
            }

            validate_duration_ladder(
                conn,
                self.settlement_repository.as_ref(),
                &members,
                group_id,
                &new_goal.category,
                new_goal.start_date,
                new_goal.end_date,
            )?;

            let goal = Goal {
                id: Uuid::new_v4().to_string(),
                group_id: group_id.to_string(),
                name: new_goal.name.clone(),
                category: new_goal.category.clone(),
                target_value: new_goal.target_value,
                unit: new_goal.unit.clone(),
                start_date: new_goal.start_date,
                end_date: new_goal.end_date,
                reward_punishment: new_goal.reward_punishment.clone(),
                evidence_requirement: new_goal.evidence_requirement.clone(),
                status: GoalStatus::Pending,
                created_by: user_id.to_string(),
                created_at: now,
                updated_at: now,
            };
            self.goal_repository.insert_goal(conn, &goal)?;

            for m in &members {
                let status = if m.id == member.id {
                    ConfirmationStatus::Approved
                } else {
                    ConfirmationStatus::Pending
                };
                self.goal_repository.insert_confirmation(
                    conn,
                    &GoalConfirmation {
                        id: Uuid::new_v4().to_string(),
                        goal_id: goal.id.clone(),
                        member_id: m.id.clone(),
                        status,
                        created_at: now,
                    },
                )?;
            }

            let events = vec![DomainEvent::GoalCreated {
                group_id: group_id.to_string(),
                goal_id: goal.id.clone(),
                goal_name: goal.name.clone(),
                actor_id: user_id.to_string(),
            }];
            Ok((goal, events))
        })?;

        debug!("Created goal {} ({}) in group {}", goal.name, goal.id, group_id);
        self.event_sink.emit_batch(events);
        Ok(goal)
    }

    async fn confirm_goal(&self, goal_id: &str, user_id: &str, approved: bool) -> Result<Goal> {
        let now = Utc::now();

        let outcome = self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            let (group, members, member) =
                self.load_group_and_member(conn, &goal.group_id, user_id)?;

            if goal.status != GoalStatus::Pending {
                return Err(Error::InvalidState(format!(
                    "goal is {}, not awaiting confirmation",
                    goal.status.as_str()
                )));
            }

            // Lazy catch-up for scheduler latency: if the start date has
            // already arrived in the group's zone, the goal is voided now
            // and the confirmation fails.
            let today = time_utils::local_today(now, &group.time_zone).ok_or_else(|| {
                Error::Validation(ValidationError::UnknownTimeZone(group.time_zone.clone()))
            })?;
            if due_transition(&goal, today) == Some(GoalStatus::Voided) {
                let mut events = Vec::new();
                apply_time_transition(
                    self.goal_repository.as_ref(),
                    self.change_request_repository.as_ref(),
                    conn,
                    &goal,
                    GoalStatus::Voided,
                    &mut events,
                )?;
                return Ok(ConfirmOutcome::LazilyVoided(events));
            }

            let confirmations = self.goal_repository.list_confirmations(conn, goal_id)?;
            let mine = confirmations
                .iter()
                .find(|c| c.member_id == member.id)
                .ok_or_else(|| {
                    Error::NotFound("no confirmation recorded for this member".to_string())
                })?;
            if mine.status != ConfirmationStatus::Pending {
                return Err(Error::AlreadyActed(
                    "confirmation already recorded".to_string(),
                ));
            }

            let status = if approved {
                ConfirmationStatus::Approved
            } else {
                ConfirmationStatus::Rejected
            };
            if !self
                .goal_repository
                .update_confirmation_if_pending(conn, &mine.id, status)?
            {
                return Err(Error::AlreadyActed(
                    "confirmation already recorded".to_string(),
                ));
            }

            let mut events = vec![DomainEvent::GoalConfirmationRecorded {
                group_id: goal.group_id.clone(),
                goal_id: goal.id.clone(),
                actor_id: user_id.to_string(),
                approved,
            }];

            if !approved {
                // A single rejection voids the goal immediately.
                let mut updated = goal.clone();
                if self.goal_repository.update_status_if(
                    conn,
                    &goal.id,
                    GoalStatus::Pending,
                    GoalStatus::Voided,
                )? {
                    updated.status = GoalStatus::Voided;
                    events.push(DomainEvent::GoalStatusChanged {
                        group_id: goal.group_id.clone(),
                        goal_id: goal.id.clone(),
                        goal_name: goal.name.clone(),
                        old_status: GoalStatus::Pending,
                        new_status: GoalStatus::Voided,
                        actor_id: Some(user_id.to_string()),
                    });
                    void_open_request(
                        self.change_request_repository.as_ref(),
                        conn,
                        &goal,
                        &mut events,
                    )?;
                }
                return Ok(ConfirmOutcome::Recorded(updated, events));
            }

            let confirmations = self.goal_repository.list_confirmations(conn, goal_id)?;
            let all_approved = confirmations
                .iter()
                .all(|c| c.status == ConfirmationStatus::Approved);
            if !all_approved {
                return Ok(ConfirmOutcome::Recorded(goal, events));
            }

            let has_challenger = members.iter().any(|m| m.is_challenger());
            let has_supervisor = members.iter().any(|m| m.is_supervisor());
            if !has_challenger || !has_supervisor {
                return Err(Error::InvalidState(
                    "group needs at least one challenger and one supervisor before the goal can be scheduled"
                        .to_string(),
                ));
            }

            let mut updated = goal.clone();
            if self.goal_repository.update_status_if(
                conn,
                &goal.id,
                GoalStatus::Pending,
                GoalStatus::Upcoming,
            )? {
                updated.status = GoalStatus::Upcoming;
                for m in members.iter().filter(|m| m.is_challenger()) {
                    self.goal_repository.insert_participant(
                        conn,
                        &GoalParticipant {
                            id: Uuid::new_v4().to_string(),
                            goal_id: goal.id.clone(),
                            member_id: m.id.clone(),
                            created_at: now,
                        },
                    )?;
                }
                events.push(DomainEvent::GoalStatusChanged {
                    group_id: goal.group_id.clone(),
                    goal_id: goal.id.clone(),
                    goal_name: goal.name.clone(),
                    old_status: GoalStatus::Pending,
                    new_status: GoalStatus::Upcoming,
                    actor_id: Some(user_id.to_string()),
                });
            }
            Ok(ConfirmOutcome::Recorded(updated, events))
        })?;

        match outcome {
            ConfirmOutcome::Recorded(goal, events) => {
                self.event_sink.emit_batch(events);
                Ok(goal)
            }
            ConfirmOutcome::LazilyVoided(events) => {
                self.event_sink.emit_batch(events);
                Err(Error::InvalidState(
                    "the start date has arrived; goal was voided".to_string(),
                ))
            }
        }
    }

    fn get_goal_detail(&self, goal_id: &str) -> Result<GoalDetail> {
        self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            let confirmations = self.goal_repository.list_confirmations(conn, goal_id)?;
            let participants = self.goal_repository.list_participants(conn, goal_id)?;
            Ok(GoalDetail {
                goal,
                confirmations,
                participants,
            })
        })
    }

    async fn sweep_time_transitions(&self, now: DateTime<Utc>) -> Result<usize> {
        let (open_goals, groups) = self.transaction_executor.execute(|conn| {
            let goals = self
                .goal_repository
                .list_goals_with_status(conn, &GoalStatus::OPEN)?;
            let mut groups: HashMap<String, Group> = HashMap::new();
            for goal in &goals {
                if !groups.contains_key(&goal.group_id) {
                    let group = self.group_repository.get_group(conn, &goal.group_id)?;
                    groups.insert(goal.group_id.clone(), group);
                }
            }
            Ok((goals, groups))
        })?;

        // One "today" computation per zone, not per goal.
        let mut zones: HashMap<&str, Vec<&Goal>> = HashMap::new();
        for goal in &open_goals {
            if let Some(group) = groups.get(&goal.group_id) {
                zones.entry(group.time_zone.as_str()).or_default().push(goal);
            }
        }

        let mut transitioned = 0;
        for (zone, zone_goals) in zones {
            let Some(today) = time_utils::local_today(now, zone) else {
                warn!(
                    "Skipping {} goal(s): unrecognized group time zone '{}'",
                    zone_goals.len(),
                    zone
                );
                continue;
            };

            // Activation runs before settling, which runs before voiding, so
            // a goal observed mid-tick never skips a state.
            for phase in [GoalStatus::Upcoming, GoalStatus::Active, GoalStatus::Pending] {
                for goal in zone_goals.iter().filter(|g| g.status == phase) {
                    let events = self.transaction_executor.execute(|conn| {
                        let mut events = Vec::new();
                        let fresh = self.goal_repository.get_goal(conn, &goal.id)?;
                        if let Some(next) = due_transition(&fresh, today) {
                            apply_time_transition(
                                self.goal_repository.as_ref(),
                                self.change_request_repository.as_ref(),
                                conn,
                                &fresh,
                                next,
                                &mut events,
                            )?;
                        }
                        Ok(events)
                    })?;
                    if !events.is_empty() {
                        transitioned += 1;
                    }
                    self.event_sink.emit_batch(events);
                }
            }
        }
        Ok(transitioned)
    }
}
