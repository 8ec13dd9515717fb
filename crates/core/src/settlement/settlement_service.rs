use chrono::Utc;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::settlement_model::{
    duration_ladder_months, AchieverResult, SettlementConfirmation, SettlementResult,
};
use super::settlement_traits::{SettlementRepositoryTrait, SettlementServiceTrait};
use crate::checkins::{CheckinRepositoryTrait, CheckinService};
use crate::db::{DbConnection, DbTransactionExecutor};
use crate::errors::{Error, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::goals::{Goal, GoalRepositoryTrait, GoalStatus};
use crate::groups::{GroupRepositoryTrait, Member};

/// Service owning settlement sign-off and goal archival.
pub struct SettlementService<E: DbTransactionExecutor + Send + Sync> {
    settlement_repository: Arc<dyn SettlementRepositoryTrait>,
    checkin_repository: Arc<dyn CheckinRepositoryTrait>,
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    group_repository: Arc<dyn GroupRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> SettlementService<E> {
    pub fn new(
        settlement_repository: Arc<dyn SettlementRepositoryTrait>,
        checkin_repository: Arc<dyn CheckinRepositoryTrait>,
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        group_repository: Arc<dyn GroupRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            settlement_repository,
            checkin_repository,
            goal_repository,
            group_repository,
            event_sink,
            transaction_executor,
        }
    }

    /// Attempts the SETTLING -> ARCHIVED transition inside `conn`.
    ///
    /// The compare-and-swap makes this idempotent under races: exactly one
    /// caller wins the swap and performs the completion-count aggregation;
    /// everyone else sees `false` and leaves the streaks untouched.
    fn archive_if_ready(
        &self,
        conn: &mut DbConnection,
        goal: &Goal,
        members: &[Member],
        events: &mut Vec<DomainEvent>,
    ) -> Result<bool> {
        if self.checkin_repository.count_pending_review(conn, &goal.id)? > 0 {
            return Ok(false);
        }

        let confirmations = self.settlement_repository.list_confirmations(conn, &goal.id)?;
        let all_signed = members
            .iter()
            .filter(|m| m.is_supervisor())
            .all(|m| confirmations.iter().any(|c| c.member_id == m.id));
        if !all_signed {
            return Ok(false);
        }

        if !self.goal_repository.update_status_if(
            conn,
            &goal.id,
            GoalStatus::Settling,
            GoalStatus::Archived,
        )? {
            return Ok(false);
        }
        events.push(DomainEvent::GoalStatusChanged {
            group_id: goal.group_id.clone(),
            goal_id: goal.id.clone(),
            goal_name: goal.name.clone(),
            old_status: GoalStatus::Settling,
            new_status: GoalStatus::Archived,
            actor_id: None,
        });

        // Winner of the swap records completions, once per archival.
        let progress = CheckinService::<E>::build_progress(
            self.checkin_repository.as_ref(),
            self.goal_repository.as_ref(),
            self.group_repository.as_ref(),
            conn,
            goal,
        )?;
        for row in progress.participants.iter().filter(|p| p.achieved) {
            let completion = self.settlement_repository.increment_category_completion(
                conn,
                &goal.group_id,
                &row.user_id,
                &goal.category,
            )?;
            let months = duration_ladder_months(completion.completion_count);
            if months > duration_ladder_months(completion.completion_count - 1) {
                events.push(DomainEvent::TierUnlocked {
                    group_id: goal.group_id.clone(),
                    user_id: row.user_id.clone(),
                    category: goal.category.clone(),
                    completion_count: completion.completion_count,
                    allowed_months: months,
                });
            }
        }

        events.push(DomainEvent::GoalArchived {
            group_id: goal.group_id.clone(),
            goal_id: goal.id.clone(),
            goal_name: goal.name.clone(),
        });
        Ok(true)
    }

    fn build_settlement_result(
        &self,
        conn: &mut DbConnection,
        goal: &Goal,
    ) -> Result<SettlementResult> {
        let confirmations = self.settlement_repository.list_confirmations(conn, &goal.id)?;
        let progress = CheckinService::<E>::build_progress(
            self.checkin_repository.as_ref(),
            self.goal_repository.as_ref(),
            self.group_repository.as_ref(),
            conn,
            goal,
        )?;

        let mut results = Vec::with_capacity(progress.participants.len());
        for row in progress.participants {
            // Unlocked months are only knowable once archival has recorded
            // the completion.
            let unlocked_months = if goal.status == GoalStatus::Archived && row.achieved {
                let count = self
                    .settlement_repository
                    .find_category_completion(conn, &goal.group_id, &row.user_id, &goal.category)?
                    .map(|c| c.completion_count)
                    .unwrap_or(0);
                let months = duration_ladder_months(count);
                (months > duration_ladder_months(count - 1)).then_some(months)
            } else {
                None
            };
            results.push(AchieverResult {
                member_id: row.member_id,
                user_id: row.user_id,
                completed_value: row.completed_value,
                percentage: row.percentage,
                achieved: row.achieved,
                unlocked_months,
            });
        }

        Ok(SettlementResult {
            goal_id: goal.id.clone(),
            status: goal.status,
            target_value: goal.target_value,
            confirmations,
            results,
        })
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> SettlementServiceTrait for SettlementService<E> {
    async fn confirm_settlement(&self, goal_id: &str, user_id: &str) -> Result<SettlementResult> {
        let now = Utc::now();

        let (result, events) = self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            if goal.status != GoalStatus::Settling {
                return Err(Error::InvalidState(format!(
                    "settlement sign-off requires a settling goal, not {}",
                    goal.status.as_str()
                )));
            }

            let members = self.group_repository.list_members(conn, &goal.group_id)?;
            let member = members
                .iter()
                .find(|m| m.user_id == user_id)
                .cloned()
                .ok_or_else(|| Error::Forbidden("not a member of this group".to_string()))?;
            if !member.is_supervisor() {
                return Err(Error::Forbidden(
                    "only supervisors confirm settlement".to_string(),
                ));
            }

            if self.checkin_repository.count_pending_review(conn, &goal.id)? > 0 {
                return Err(Error::InvalidState(
                    "check-ins are still pending review".to_string(),
                ));
            }

            let confirmations = self.settlement_repository.list_confirmations(conn, &goal.id)?;
            if confirmations.iter().any(|c| c.member_id == member.id) {
                return Err(Error::AlreadyActed(
                    "settlement already confirmed by you".to_string(),
                ));
            }

            self.settlement_repository
                .insert_confirmation(
                    conn,
                    &SettlementConfirmation {
                        id: Uuid::new_v4().to_string(),
                        goal_id: goal.id.clone(),
                        member_id: member.id.clone(),
                        created_at: now,
                    },
                )
                .map_err(|e| e.map_unique_violation("settlement already confirmed by you"))?;

            let mut events = vec![DomainEvent::SettlementConfirmed {
                group_id: goal.group_id.clone(),
                goal_id: goal.id.clone(),
                actor_id: user_id.to_string(),
            }];

            let archived = self.archive_if_ready(conn, &goal, &members, &mut events)?;
            let mut goal = goal;
            if archived {
                goal.status = GoalStatus::Archived;
            }
            let result = self.build_settlement_result(conn, &goal)?;
            Ok((result, events))
        })?;

        self.event_sink.emit_batch(events);
        Ok(result)
    }

    async fn try_archive(&self, goal_id: &str) -> Result<bool> {
        let (archived, events) = self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            match goal.status {
                GoalStatus::Archived => return Ok((true, Vec::new())),
                GoalStatus::Settling => {}
                other => {
                    return Err(Error::InvalidState(format!(
                        "cannot archive a {} goal",
                        other.as_str()
                    )))
                }
            }

            let members = self.group_repository.list_members(conn, &goal.group_id)?;
            let mut events = Vec::new();
            let archived = self.archive_if_ready(conn, &goal, &members, &mut events)?;
            Ok((archived, events))
        })?;

        if archived && !events.is_empty() {
            debug!("Goal {goal_id} archived");
        }
        self.event_sink.emit_batch(events);
        Ok(archived)
    }

    fn get_settlement_result(&self, goal_id: &str) -> Result<SettlementResult> {
        self.transaction_executor.execute(|conn| {
            let goal = self.goal_repository.get_goal(conn, goal_id)?;
            if !matches!(goal.status, GoalStatus::Settling | GoalStatus::Archived) {
                return Err(Error::InvalidState(format!(
                    "no settlement result for a {} goal",
                    goal.status.as_str()
                )));
            }
            self.build_settlement_result(conn, &goal)
        })
    }
}
