#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, Utc};

    use crate::checkins::{
        Checkin, CheckinService, CheckinServiceTrait, CheckinStatus, EvidenceUpload, NewCheckin,
        ReviewAction,
    };
    use crate::errors::Error;
    use crate::events::{DomainEvent, MockDomainEventSink};
    use crate::goals::{Goal, GoalParticipant, GoalStatus};
    use crate::groups::{Group, Member, MemberRole};
    use crate::mocks::{
        test_pool, MockCheckinRepository, MockEvidenceStore, MockGoalRepository,
        MockGroupRepository,
    };

    fn member(user_id: &str, role: MemberRole) -> Member {
        Member {
            id: format!("member-{user_id}"),
            group_id: "group-1".to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now(),
        }
    }

    fn today_utc() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn active_goal() -> Goal {
        let today = today_utc();
        Goal {
            id: "goal-1".to_string(),
            group_id: "group-1".to_string(),
            name: "Run 100 km".to_string(),
            category: "fitness".to_string(),
            target_value: 100.0,
            unit: "km".to_string(),
            start_date: today - Duration::days(10),
            end_date: today + Duration::days(10),
            reward_punishment: String::new(),
            evidence_requirement: String::new(),
            status: GoalStatus::Active,
            created_by: "alice".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn upload(name: &str) -> EvidenceUpload {
        EvidenceUpload {
            file_name: name.to_string(),
            bytes: vec![0u8; 128],
        }
    }

    fn submission(date: NaiveDate, value: f64) -> NewCheckin {
        NewCheckin {
            goal_id: "goal-1".to_string(),
            checkin_date: date,
            value,
            note: Some("morning run".to_string()),
            evidence: vec![upload("run.jpg")],
        }
    }

    fn pending_checkin(id: &str, member_id: &str, value: f64) -> Checkin {
        Checkin {
            id: id.to_string(),
            goal_id: "goal-1".to_string(),
            group_id: "group-1".to_string(),
            member_id: member_id.to_string(),
            checkin_date: today_utc() - Duration::days(1),
            value,
            note: None,
            evidence: vec![],
            status: CheckinStatus::PendingReview,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Setup {
        checkin_repo: Arc<MockCheckinRepository>,
        goal_repo: Arc<MockGoalRepository>,
        group_repo: Arc<MockGroupRepository>,
        evidence_store: Arc<MockEvidenceStore>,
        sink: MockDomainEventSink,
    }

    impl Setup {
        fn new(members: Vec<Member>, goal: Goal) -> Self {
            let group = Group {
                id: "group-1".to_string(),
                name: "Morning Run Pact".to_string(),
                time_zone: "Etc/UTC".to_string(),
                created_at: Utc::now(),
            };
            let goal_repo = MockGoalRepository::with_goal(goal);
            goal_repo
                .participants
                .lock()
                .unwrap()
                .push(GoalParticipant {
                    id: "participant-alice".to_string(),
                    goal_id: "goal-1".to_string(),
                    member_id: "member-alice".to_string(),
                    created_at: Utc::now(),
                });
            Self {
                checkin_repo: Arc::new(MockCheckinRepository::default()),
                goal_repo: Arc::new(goal_repo),
                group_repo: Arc::new(MockGroupRepository::with_group(group, members)),
                evidence_store: Arc::new(MockEvidenceStore::default()),
                sink: MockDomainEventSink::new(),
            }
        }

        fn service(&self) -> CheckinService<crate::db::DbPool> {
            CheckinService::new(
                self.checkin_repo.clone(),
                self.goal_repo.clone(),
                self.group_repo.clone(),
                self.evidence_store.clone(),
                Arc::new(self.sink.clone()),
                test_pool(),
            )
        }
    }

    fn full_roster() -> Vec<Member> {
        vec![
            member("alice", MemberRole::Challenger),
            member("bob", MemberRole::Supervisor),
            member("carol", MemberRole::Supervisor),
        ]
    }

    #[tokio::test]
    async fn test_submit_checkin_stores_evidence_and_awaits_review() {
        let setup = Setup::new(full_roster(), active_goal());
        let service = setup.service();

        let checkin = service
            .submit_checkin("alice", submission(today_utc(), 5.0))
            .await
            .unwrap();

        assert_eq!(checkin.status, CheckinStatus::PendingReview);
        assert_eq!(checkin.evidence.len(), 1);
        assert_eq!(checkin.evidence[0].path, "evidence/run.jpg");
        assert!(setup.evidence_store.deleted.lock().unwrap().is_empty());

        let events = setup.sink.events();
        assert!(matches!(
            events[0],
            DomainEvent::CheckinSubmitted { value, .. } if value == 5.0
        ));
    }

    #[tokio::test]
    async fn test_submit_checkin_outside_active_deletes_stored_evidence() {
        let mut goal = active_goal();
        goal.status = GoalStatus::Settling;
        let setup = Setup::new(full_roster(), goal);
        let service = setup.service();

        let result = service
            .submit_checkin("alice", submission(today_utc() - Duration::days(1), 5.0))
            .await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        // Files written before the transaction are compensated.
        assert_eq!(
            setup.evidence_store.deleted.lock().unwrap().clone(),
            vec!["evidence/run.jpg".to_string()]
        );
        assert!(setup.checkin_repo.checkins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_checkin_evidence_store_failure_compensates_earlier_files() {
        let setup = Setup::new(full_roster(), active_goal());
        let failing = Arc::new(MockEvidenceStore::failing_after(1));
        let service = CheckinService::new(
            setup.checkin_repo.clone(),
            setup.goal_repo.clone(),
            setup.group_repo.clone(),
            failing.clone(),
            Arc::new(setup.sink.clone()),
            test_pool(),
        );

        let mut new_checkin = submission(today_utc(), 5.0);
        new_checkin.evidence = vec![upload("a.jpg"), upload("b.jpg")];
        let result = service.submit_checkin("alice", new_checkin).await;
        assert!(matches!(result, Err(Error::Evidence(_))));
        assert_eq!(
            failing.deleted.lock().unwrap().clone(),
            vec!["evidence/a.jpg".to_string()]
        );
    }

    #[tokio::test]
    async fn test_submit_checkin_supervisor_forbidden() {
        let setup = Setup::new(full_roster(), active_goal());
        let service = setup.service();

        let result = service
            .submit_checkin("bob", submission(today_utc(), 5.0))
            .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_submit_checkin_date_must_fall_inside_elapsed_goal_window() {
        let setup = Setup::new(full_roster(), active_goal());
        let service = setup.service();

        // Before the goal started.
        let result = service
            .submit_checkin("alice", submission(today_utc() - Duration::days(11), 5.0))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        // Tomorrow has not happened yet.
        let result = service
            .submit_checkin("alice", submission(today_utc() + Duration::days(1), 5.0))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_dispute_requires_reason() {
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        let result = service
            .review_checkin("checkin-1", "bob", ReviewAction::Disputed, None)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let result = service
            .review_checkin(
                "checkin-1",
                "bob",
                ReviewAction::Disputed,
                Some("   ".to_string()),
            )
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_single_dispute_vetoes_checkin() {
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        let reviewed = service
            .review_checkin(
                "checkin-1",
                "bob",
                ReviewAction::Disputed,
                Some("screenshot shows a different date".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, CheckinStatus::Disputed);

        let events = setup.sink.events();
        assert!(matches!(
            events[0],
            DomainEvent::CheckinReviewed { confirmed: false, .. }
        ));
        assert!(matches!(
            events[1],
            DomainEvent::CheckinStatusChanged {
                new_status: CheckinStatus::Disputed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_confirmation_needs_every_supervisor() {
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        let after_bob = service
            .review_checkin("checkin-1", "bob", ReviewAction::Confirmed, None)
            .await
            .unwrap();
        assert_eq!(after_bob.status, CheckinStatus::PendingReview);

        let after_carol = service
            .review_checkin("checkin-1", "carol", ReviewAction::Confirmed, None)
            .await
            .unwrap();
        assert_eq!(after_carol.status, CheckinStatus::Confirmed);
        assert_eq!(
            setup.checkin_repo.checkin("checkin-1").status,
            CheckinStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_review_twice_is_rejected() {
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        service
            .review_checkin("checkin-1", "bob", ReviewAction::Confirmed, None)
            .await
            .unwrap();
        let result = service
            .review_checkin("checkin-1", "bob", ReviewAction::Confirmed, None)
            .await;
        assert!(matches!(result, Err(Error::AlreadyActed(_))));
    }

    #[tokio::test]
    async fn test_challenger_cannot_review() {
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        let result = service
            .review_checkin("checkin-1", "alice", ReviewAction::Confirmed, None)
            .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_review_stays_open_through_settling() {
        let mut goal = active_goal();
        goal.status = GoalStatus::Settling;
        let setup = Setup::new(full_roster(), goal);
        setup
            .checkin_repo
            .checkins
            .lock()
            .unwrap()
            .insert("checkin-1".to_string(), pending_checkin("checkin-1", "member-alice", 5.0));
        let service = setup.service();

        let reviewed = service
            .review_checkin("checkin-1", "bob", ReviewAction::Confirmed, None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, CheckinStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_auto_approve_only_past_review_window() {
        let setup = Setup::new(full_roster(), active_goal());
        let mut old = pending_checkin("checkin-old", "member-alice", 30.0);
        old.created_at = Utc::now() - Duration::days(4);
        let fresh = pending_checkin("checkin-fresh", "member-alice", 10.0);
        {
            let mut checkins = setup.checkin_repo.checkins.lock().unwrap();
            checkins.insert(old.id.clone(), old);
            checkins.insert(fresh.id.clone(), fresh);
        }
        let service = setup.service();

        assert_eq!(service.auto_approve_stale(Utc::now()).await.unwrap(), 1);
        assert_eq!(
            setup.checkin_repo.checkin("checkin-old").status,
            CheckinStatus::AutoApproved
        );
        assert_eq!(
            setup.checkin_repo.checkin("checkin-fresh").status,
            CheckinStatus::PendingReview
        );

        // Re-running changes nothing.
        assert_eq!(service.auto_approve_stale(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_progress_counts_confirmed_and_auto_approved_only() {
        let setup = Setup::new(full_roster(), active_goal());
        {
            let mut checkins = setup.checkin_repo.checkins.lock().unwrap();
            let mut confirmed = pending_checkin("checkin-1", "member-alice", 60.0);
            confirmed.status = CheckinStatus::Confirmed;
            let mut auto = pending_checkin("checkin-2", "member-alice", 40.0);
            auto.status = CheckinStatus::AutoApproved;
            let mut disputed = pending_checkin("checkin-3", "member-alice", 25.0);
            disputed.status = CheckinStatus::Disputed;
            let pending = pending_checkin("checkin-4", "member-alice", 15.0);
            for checkin in [confirmed, auto, disputed, pending] {
                checkins.insert(checkin.id.clone(), checkin);
            }
        }
        let service = setup.service();

        let progress = service.get_progress("goal-1").unwrap();
        assert_eq!(progress.participants.len(), 1);
        let alice = &progress.participants[0];
        assert_eq!(alice.user_id, "alice");
        assert_eq!(alice.completed_value, 100.0);
        assert_eq!(alice.percentage, 100.0);
        assert!(alice.achieved);
    }

    #[tokio::test]
    async fn test_progress_with_orphaned_participant_is_an_error() {
        // A participant row pointing at a member no longer in the roster is
        // a data integrity fault, not an anonymous participant.
        let setup = Setup::new(full_roster(), active_goal());
        setup
            .goal_repo
            .participants
            .lock()
            .unwrap()
            .push(GoalParticipant {
                id: "participant-ghost".to_string(),
                goal_id: "goal-1".to_string(),
                member_id: "member-ghost".to_string(),
                created_at: Utc::now(),
            });
        let service = setup.service();

        let result = service.get_progress("goal-1");
        assert!(matches!(result, Err(Error::Unexpected(_))));
    }
}
