use chrono::Utc;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::groups_model::{Group, Member, MemberRole, NewGroup};
use super::groups_traits::{GroupRepositoryTrait, GroupServiceTrait};
use crate::change_requests::{ChangeRequestRepositoryTrait, ChangeRequestStatus, ChangeVote, VoteStatus};
use crate::constants::NAME_MAX_LEN;
use crate::db::DbTransactionExecutor;
use crate::errors::{Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::goals::{GoalParticipant, GoalRepositoryTrait, GoalStatus};
use crate::utils::time_utils;

/// Service for managing pact groups and their rosters.
pub struct GroupService<E: DbTransactionExecutor + Send + Sync> {
    group_repository: Arc<dyn GroupRepositoryTrait>,
    goal_repository: Arc<dyn GoalRepositoryTrait>,
    change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    transaction_executor: E,
}

impl<E: DbTransactionExecutor + Send + Sync> GroupService<E> {
    pub fn new(
        group_repository: Arc<dyn GroupRepositoryTrait>,
        goal_repository: Arc<dyn GoalRepositoryTrait>,
        change_request_repository: Arc<dyn ChangeRequestRepositoryTrait>,
        event_sink: Arc<dyn DomainEventSink>,
        transaction_executor: E,
    ) -> Self {
        Self {
            group_repository,
            goal_repository,
            change_request_repository,
            event_sink,
            transaction_executor,
        }
    }
}

#[async_trait::async_trait]
impl<E: DbTransactionExecutor + Send + Sync> GroupServiceTrait for GroupService<E> {
    async fn create_group(
        &self,
        new_group: NewGroup,
        creator_user_id: &str,
        creator_role: MemberRole,
    ) -> Result<Group> {
        if new_group.name.trim().is_empty() || new_group.name.len() > NAME_MAX_LEN {
            return Err(ValidationError::InvalidInput(format!(
                "group name must be 1-{NAME_MAX_LEN} characters"
            ))
            .into());
        }
        if time_utils::parse_zone(&new_group.time_zone).is_none() {
            return Err(ValidationError::UnknownTimeZone(new_group.time_zone).into());
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4().to_string(),
            name: new_group.name.trim().to_string(),
            time_zone: new_group.time_zone,
            created_at: now,
        };
        let creator = Member {
            id: Uuid::new_v4().to_string(),
            group_id: group.id.clone(),
            user_id: creator_user_id.to_string(),
            role: creator_role,
            joined_at: now,
        };

        debug!("Creating group {} in zone {}", group.name, group.time_zone);

        let created = self.transaction_executor.execute(|conn| {
            self.group_repository.insert_group(conn, &group)?;
            self.group_repository.insert_member(conn, &creator)?;
            Ok(group.clone())
        })?;

        self.event_sink.emit(DomainEvent::MemberJoined {
            group_id: created.id.clone(),
            member_id: creator.id,
            role: creator.role.as_str().to_string(),
        });
        Ok(created)
    }

    async fn add_member(&self, group_id: &str, user_id: &str, role: MemberRole) -> Result<Member> {
        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: now,
        };

        let member_for_tx = member.clone();
        let added = self.transaction_executor.execute(|conn| {
            self.group_repository.get_group(conn, group_id)?;
            if self
                .group_repository
                .find_member(conn, group_id, user_id)?
                .is_some()
            {
                return Err(crate::errors::Error::AlreadyActed(
                    "user is already a member of this group".to_string(),
                ));
            }
            self.group_repository
                .insert_member(conn, &member_for_tx)
                .map_err(|e| e.map_unique_violation("user is already a member of this group"))?;

            // Late-joiner hooks: the unanimity check always covers the live
            // roster, so an open change request gains a fresh pending vote,
            // and a joining challenger enrolls in an upcoming/active goal.
            if let Some(goal) = self.goal_repository.find_open_goal(conn, group_id)? {
                if let Some(request) = self
                    .change_request_repository
                    .find_open_request(conn, &goal.id)?
                {
                    if request.status == ChangeRequestStatus::Pending && !request.is_expired(now) {
                        let vote = ChangeVote {
                            id: Uuid::new_v4().to_string(),
                            request_id: request.id.clone(),
                            member_id: member_for_tx.id.clone(),
                            status: VoteStatus::Pending,
                            created_at: now,
                        };
                        self.change_request_repository.insert_vote(conn, &vote)?;
                    }
                }

                if role == MemberRole::Challenger
                    && matches!(goal.status, GoalStatus::Upcoming | GoalStatus::Active)
                {
                    let participant = GoalParticipant {
                        id: Uuid::new_v4().to_string(),
                        goal_id: goal.id.clone(),
                        member_id: member_for_tx.id.clone(),
                        created_at: now,
                    };
                    self.goal_repository.insert_participant(conn, &participant)?;
                }
            }

            Ok(member_for_tx.clone())
        })?;

        self.event_sink.emit(DomainEvent::MemberJoined {
            group_id: group_id.to_string(),
            member_id: added.id.clone(),
            role: added.role.as_str().to_string(),
        });
        Ok(added)
    }

    fn get_group(&self, group_id: &str) -> Result<Group> {
        self.transaction_executor
            .execute(|conn| self.group_repository.get_group(conn, group_id))
    }

    fn get_members(&self, group_id: &str) -> Result<Vec<Member>> {
        self.transaction_executor.execute(|conn| {
            self.group_repository.get_group(conn, group_id)?;
            self.group_repository.list_members(conn, group_id)
        })
    }
}
