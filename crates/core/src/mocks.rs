//! In-memory repository fakes shared by the service test modules.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;

use crate::change_requests::{
    ChangeRequest, ChangeRequestRepositoryTrait, ChangeRequestStatus, ChangeVote, VoteStatus,
};
use crate::checkins::{
    Checkin, CheckinRepositoryTrait, CheckinReview, CheckinStatus, EvidenceStoreTrait,
    StoredEvidence,
};
use crate::db::{DbConnection, DbPool};
use crate::errors::{Error, Result};
use crate::goals::{
    ConfirmationStatus, Goal, GoalConfirmation, GoalParticipant, GoalRepositoryTrait, GoalStatus,
};
use crate::groups::{Group, GroupRepositoryTrait, Member};
use crate::settlement::{CategoryCompletion, SettlementConfirmation, SettlementRepositoryTrait};

/// Single-connection in-memory pool; the executor under test still runs real
/// transactions even though the fakes below never touch the connection.
pub fn test_pool() -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("in-memory pool")
}

#[derive(Default)]
pub struct MockGroupRepository {
    pub groups: Mutex<HashMap<String, Group>>,
    pub members: Mutex<Vec<Member>>,
}

impl MockGroupRepository {
    pub fn with_group(group: Group, members: Vec<Member>) -> Self {
        let repo = Self::default();
        repo.groups
            .lock()
            .unwrap()
            .insert(group.id.clone(), group);
        *repo.members.lock().unwrap() = members;
        repo
    }

    pub fn add_member(&self, member: Member) {
        self.members.lock().unwrap().push(member);
    }
}

impl GroupRepositoryTrait for MockGroupRepository {
    fn insert_group(&self, _conn: &mut DbConnection, group: &Group) -> Result<()> {
        self.groups
            .lock()
            .unwrap()
            .insert(group.id.clone(), group.clone());
        Ok(())
    }

    fn insert_member(&self, _conn: &mut DbConnection, member: &Member) -> Result<()> {
        self.members.lock().unwrap().push(member.clone());
        Ok(())
    }

    fn get_group(&self, _conn: &mut DbConnection, group_id: &str) -> Result<Group> {
        self.groups
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("group {group_id}")))
    }

    fn list_members(&self, _conn: &mut DbConnection, group_id: &str) -> Result<Vec<Member>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    fn find_member(
        &self,
        _conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct MockGoalRepository {
    pub goals: Mutex<HashMap<String, Goal>>,
    pub confirmations: Mutex<Vec<GoalConfirmation>>,
    pub participants: Mutex<Vec<GoalParticipant>>,
}

impl MockGoalRepository {
    pub fn with_goal(goal: Goal) -> Self {
        let repo = Self::default();
        repo.goals.lock().unwrap().insert(goal.id.clone(), goal);
        repo
    }

    pub fn goal(&self, goal_id: &str) -> Goal {
        self.goals.lock().unwrap().get(goal_id).cloned().unwrap()
    }
}

impl GoalRepositoryTrait for MockGoalRepository {
    fn insert_goal(&self, _conn: &mut DbConnection, goal: &Goal) -> Result<()> {
        self.goals
            .lock()
            .unwrap()
            .insert(goal.id.clone(), goal.clone());
        Ok(())
    }

    fn get_goal(&self, _conn: &mut DbConnection, goal_id: &str) -> Result<Goal> {
        self.goals
            .lock()
            .unwrap()
            .get(goal_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("goal {goal_id}")))
    }

    fn find_open_goal(&self, _conn: &mut DbConnection, group_id: &str) -> Result<Option<Goal>> {
        Ok(self
            .goals
            .lock()
            .unwrap()
            .values()
            .find(|g| g.group_id == group_id && g.status.is_open())
            .cloned())
    }

    fn list_goals_with_status(
        &self,
        _conn: &mut DbConnection,
        statuses: &[GoalStatus],
    ) -> Result<Vec<Goal>> {
        Ok(self
            .goals
            .lock()
            .unwrap()
            .values()
            .filter(|g| statuses.contains(&g.status))
            .cloned()
            .collect())
    }

    fn update_goal_fields(&self, _conn: &mut DbConnection, goal: &Goal) -> Result<()> {
        let mut goals = self.goals.lock().unwrap();
        let existing = goals
            .get_mut(&goal.id)
            .ok_or_else(|| Error::NotFound(format!("goal {}", goal.id)))?;
        existing.name = goal.name.clone();
        existing.category = goal.category.clone();
        existing.target_value = goal.target_value;
        existing.unit = goal.unit.clone();
        existing.start_date = goal.start_date;
        existing.end_date = goal.end_date;
        existing.reward_punishment = goal.reward_punishment.clone();
        existing.evidence_requirement = goal.evidence_requirement.clone();
        existing.updated_at = goal.updated_at;
        Ok(())
    }

    fn update_status_if(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
        expected: GoalStatus,
        new_status: GoalStatus,
    ) -> Result<bool> {
        let mut goals = self.goals.lock().unwrap();
        match goals.get_mut(goal_id) {
            Some(goal) if goal.status == expected => {
                goal.status = new_status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_confirmation(
        &self,
        _conn: &mut DbConnection,
        confirmation: &GoalConfirmation,
    ) -> Result<()> {
        self.confirmations.lock().unwrap().push(confirmation.clone());
        Ok(())
    }

    fn list_confirmations(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalConfirmation>> {
        Ok(self
            .confirmations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.goal_id == goal_id)
            .cloned()
            .collect())
    }

    fn update_confirmation_if_pending(
        &self,
        _conn: &mut DbConnection,
        confirmation_id: &str,
        status: ConfirmationStatus,
    ) -> Result<bool> {
        let mut confirmations = self.confirmations.lock().unwrap();
        match confirmations
            .iter_mut()
            .find(|c| c.id == confirmation_id && c.status == ConfirmationStatus::Pending)
        {
            Some(confirmation) => {
                confirmation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_confirmations(&self, _conn: &mut DbConnection, goal_id: &str) -> Result<usize> {
        let mut confirmations = self.confirmations.lock().unwrap();
        let before = confirmations.len();
        confirmations.retain(|c| c.goal_id != goal_id);
        Ok(before - confirmations.len())
    }

    fn insert_participant(
        &self,
        _conn: &mut DbConnection,
        participant: &GoalParticipant,
    ) -> Result<()> {
        self.participants.lock().unwrap().push(participant.clone());
        Ok(())
    }

    fn list_participants(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<GoalParticipant>> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.goal_id == goal_id)
            .cloned()
            .collect())
    }

    fn find_participant(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
        member_id: &str,
    ) -> Result<Option<GoalParticipant>> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.goal_id == goal_id && p.member_id == member_id)
            .cloned())
    }

    fn delete_participants(&self, _conn: &mut DbConnection, goal_id: &str) -> Result<usize> {
        let mut participants = self.participants.lock().unwrap();
        let before = participants.len();
        participants.retain(|p| p.goal_id != goal_id);
        Ok(before - participants.len())
    }
}

#[derive(Default)]
pub struct MockChangeRequestRepository {
    pub requests: Mutex<HashMap<String, ChangeRequest>>,
    pub votes: Mutex<Vec<ChangeVote>>,
}

impl MockChangeRequestRepository {
    pub fn with_request(request: ChangeRequest, votes: Vec<ChangeVote>) -> Self {
        let repo = Self::default();
        repo.requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request);
        *repo.votes.lock().unwrap() = votes;
        repo
    }

    pub fn request(&self, request_id: &str) -> ChangeRequest {
        self.requests
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .unwrap()
    }
}

impl ChangeRequestRepositoryTrait for MockChangeRequestRepository {
    fn insert_request(&self, _conn: &mut DbConnection, request: &ChangeRequest) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn get_request(&self, _conn: &mut DbConnection, request_id: &str) -> Result<ChangeRequest> {
        self.requests
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("change request {request_id}")))
    }

    fn find_open_request(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Option<ChangeRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .find(|r| r.goal_id == goal_id && r.status == ChangeRequestStatus::Pending)
            .cloned())
    }

    fn list_open_requests(&self, _conn: &mut DbConnection) -> Result<Vec<ChangeRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == ChangeRequestStatus::Pending)
            .cloned()
            .collect())
    }

    fn resolve_request_if_pending(
        &self,
        _conn: &mut DbConnection,
        request_id: &str,
        status: ChangeRequestStatus,
    ) -> Result<bool> {
        let mut requests = self.requests.lock().unwrap();
        match requests.get_mut(request_id) {
            Some(request) if request.status == ChangeRequestStatus::Pending => {
                request.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_vote(&self, _conn: &mut DbConnection, vote: &ChangeVote) -> Result<()> {
        self.votes.lock().unwrap().push(vote.clone());
        Ok(())
    }

    fn list_votes(&self, _conn: &mut DbConnection, request_id: &str) -> Result<Vec<ChangeVote>> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.request_id == request_id)
            .cloned()
            .collect())
    }

    fn update_vote_if_pending(
        &self,
        _conn: &mut DbConnection,
        vote_id: &str,
        status: VoteStatus,
    ) -> Result<bool> {
        let mut votes = self.votes.lock().unwrap();
        match votes
            .iter_mut()
            .find(|v| v.id == vote_id && v.status == VoteStatus::Pending)
        {
            Some(vote) => {
                vote.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MockCheckinRepository {
    pub checkins: Mutex<HashMap<String, Checkin>>,
    pub reviews: Mutex<Vec<CheckinReview>>,
}

impl MockCheckinRepository {
    pub fn with_checkins(checkins: Vec<Checkin>) -> Self {
        let repo = Self::default();
        let mut map = repo.checkins.lock().unwrap();
        for checkin in checkins {
            map.insert(checkin.id.clone(), checkin);
        }
        drop(map);
        repo
    }

    pub fn checkin(&self, checkin_id: &str) -> Checkin {
        self.checkins
            .lock()
            .unwrap()
            .get(checkin_id)
            .cloned()
            .unwrap()
    }
}

impl CheckinRepositoryTrait for MockCheckinRepository {
    fn insert_checkin(&self, _conn: &mut DbConnection, checkin: &Checkin) -> Result<()> {
        self.checkins
            .lock()
            .unwrap()
            .insert(checkin.id.clone(), checkin.clone());
        Ok(())
    }

    fn get_checkin(&self, _conn: &mut DbConnection, checkin_id: &str) -> Result<Checkin> {
        self.checkins
            .lock()
            .unwrap()
            .get(checkin_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("check-in {checkin_id}")))
    }

    fn list_checkins_for_goal(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<Checkin>> {
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.goal_id == goal_id)
            .cloned()
            .collect())
    }

    fn update_status_if(
        &self,
        _conn: &mut DbConnection,
        checkin_id: &str,
        expected: CheckinStatus,
        new_status: CheckinStatus,
    ) -> Result<bool> {
        let mut checkins = self.checkins.lock().unwrap();
        match checkins.get_mut(checkin_id) {
            Some(checkin) if checkin.status == expected => {
                checkin.status = new_status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn count_pending_review(&self, _conn: &mut DbConnection, goal_id: &str) -> Result<i64> {
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.goal_id == goal_id && c.status == CheckinStatus::PendingReview)
            .count() as i64)
    }

    fn list_stale_pending(
        &self,
        _conn: &mut DbConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Checkin>> {
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == CheckinStatus::PendingReview && c.created_at <= cutoff)
            .cloned()
            .collect())
    }

    fn insert_review(&self, _conn: &mut DbConnection, review: &CheckinReview) -> Result<()> {
        self.reviews.lock().unwrap().push(review.clone());
        Ok(())
    }

    fn list_reviews(
        &self,
        _conn: &mut DbConnection,
        checkin_id: &str,
    ) -> Result<Vec<CheckinReview>> {
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.checkin_id == checkin_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MockSettlementRepository {
    pub confirmations: Mutex<Vec<SettlementConfirmation>>,
    pub completions: Mutex<Vec<CategoryCompletion>>,
}

impl MockSettlementRepository {
    pub fn with_completion(group_id: &str, user_id: &str, category: &str, count: i32) -> Self {
        let repo = Self::default();
        repo.completions.lock().unwrap().push(CategoryCompletion {
            id: format!("completion-{user_id}-{category}"),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            category: category.to_string(),
            completion_count: count,
            updated_at: Utc::now(),
        });
        repo
    }

    pub fn completion_count(&self, user_id: &str, category: &str) -> Option<i32> {
        self.completions
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.user_id == user_id && c.category == category)
            .map(|c| c.completion_count)
    }
}

impl SettlementRepositoryTrait for MockSettlementRepository {
    fn insert_confirmation(
        &self,
        _conn: &mut DbConnection,
        confirmation: &SettlementConfirmation,
    ) -> Result<()> {
        self.confirmations.lock().unwrap().push(confirmation.clone());
        Ok(())
    }

    fn list_confirmations(
        &self,
        _conn: &mut DbConnection,
        goal_id: &str,
    ) -> Result<Vec<SettlementConfirmation>> {
        Ok(self
            .confirmations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.goal_id == goal_id)
            .cloned()
            .collect())
    }

    fn find_category_completion(
        &self,
        _conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<Option<CategoryCompletion>> {
        Ok(self
            .completions
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.group_id == group_id && c.user_id == user_id && c.category == category)
            .cloned())
    }

    fn increment_category_completion(
        &self,
        _conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
        category: &str,
    ) -> Result<CategoryCompletion> {
        let mut completions = self.completions.lock().unwrap();
        if let Some(existing) = completions
            .iter_mut()
            .find(|c| c.group_id == group_id && c.user_id == user_id && c.category == category)
        {
            existing.completion_count += 1;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let created = CategoryCompletion {
            id: format!("completion-{user_id}-{category}"),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            category: category.to_string(),
            completion_count: 1,
            updated_at: Utc::now(),
        };
        completions.push(created.clone());
        Ok(created)
    }
}

/// Evidence store fake recording stores and deletes; `fail_after` makes the
/// n-th store fail to exercise compensation.
#[derive(Default)]
pub struct MockEvidenceStore {
    pub stored: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_after: Option<usize>,
}

impl MockEvidenceStore {
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::default()
        }
    }
}

impl EvidenceStoreTrait for MockEvidenceStore {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredEvidence> {
        let mut stored = self.stored.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if stored.len() >= limit {
                return Err(Error::Evidence(format!("disk full storing {file_name}")));
            }
        }
        let path = format!("evidence/{file_name}");
        stored.push(path.clone());
        Ok(StoredEvidence {
            path,
            size_bytes: bytes.len() as i64,
        })
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
