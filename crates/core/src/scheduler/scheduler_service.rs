use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::change_requests::ChangeRequestServiceTrait;
use crate::checkins::CheckinServiceTrait;
use crate::errors::Result;
use crate::goals::GoalServiceTrait;

/// What a single tick did. Every counter is zero on a quiet tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub expired_requests: usize,
    pub goal_transitions: usize,
    pub voided_requests: usize,
    pub auto_approved_checkins: usize,
}

/// Periodic driver for everything time can change on its own: request
/// expiry, goal lifecycle transitions at local midnight, orphaned-request
/// voiding, and check-in auto-approval.
///
/// Every step is idempotent (conditional status writes underneath), so a
/// tick that fires twice, late, or concurrently with user actions converges
/// to the same state.
pub struct SchedulerService {
    goal_service: Arc<dyn GoalServiceTrait>,
    change_request_service: Arc<dyn ChangeRequestServiceTrait>,
    checkin_service: Arc<dyn CheckinServiceTrait>,
    running: AtomicBool,
}

impl SchedulerService {
    pub fn new(
        goal_service: Arc<dyn GoalServiceTrait>,
        change_request_service: Arc<dyn ChangeRequestServiceTrait>,
        checkin_service: Arc<dyn CheckinServiceTrait>,
    ) -> Self {
        Self {
            goal_service,
            change_request_service,
            checkin_service,
            running: AtomicBool::new(false),
        }
    }

    /// Runs one tick as of `now`. Returns `Ok(None)` when a previous tick is
    /// still in flight; overlapping ticks are skipped, not queued.
    ///
    /// Step order matters: requests whose effective expiry has passed must
    /// be expired before goal transitions void them for a different reason,
    /// and orphan voiding runs after transitions so it sees the goals that
    /// just left the open statuses.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<Option<TickSummary>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Scheduler tick skipped; previous tick still running");
            return Ok(None);
        }

        // The flag is released on drop so a panicked or cancelled tick does
        // not wedge the scheduler shut.
        let _guard = RunningGuard(&self.running);
        let summary = self.tick(now).await?;
        if summary != TickSummary::default() {
            debug!(
                "Scheduler tick: {} requests expired, {} goal transitions, {} requests voided, {} check-ins auto-approved",
                summary.expired_requests,
                summary.goal_transitions,
                summary.voided_requests,
                summary.auto_approved_checkins
            );
        }
        Ok(Some(summary))
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let expired_requests = self.change_request_service.expire_stale(now).await?;
        let goal_transitions = self.goal_service.sweep_time_transitions(now).await?;
        let voided_requests = self.change_request_service.void_orphaned().await?;
        let auto_approved_checkins = self.checkin_service.auto_approve_stale(now).await?;
        Ok(TickSummary {
            expired_requests,
            goal_transitions,
            voided_requests,
            auto_approved_checkins,
        })
    }

    /// Spawns an interval loop ticking every `period`. A fallback for
    /// deployments without an external cron; the tick itself stays callable
    /// directly.
    pub fn start(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = scheduler.run_once(Utc::now()).await {
                    error!("Scheduler tick failed: {e}");
                }
            }
        })
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
